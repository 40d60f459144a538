//! Deterministic, template-free content delivered when generation is
//! unavailable or keeps producing low-quality output.

use crate::content_gate::{assess_story, looks_template_example};
use crate::error::{Result, TutorError};
use crate::exercise::{
    ChoiceKey, Choices, ComprehensionExercise, ExerciseOptions, GeneratedStory, KeyVocabulary,
    LearningDirection, OutputStyle, QuestionType, RawQuestion, StoryBlock, StoryLevel, VocabExercise,
};

const MEANINGS: &[(&str, &str, &str)] = &[
    ("happy", "feeling glad and full of joy.", "感到开心和快乐。"),
    ("sad", "feeling unhappy.", "感到难过。"),
    ("brave", "showing courage when something feels hard.", "在困难时表现出勇气。"),
    ("gentle", "kind, soft, and not rough.", "温和、不粗暴。"),
    ("kind", "being nice and helpful to others.", "对别人友善并愿意帮助。"),
    ("strong", "having a lot of power in body or mind.", "身体或意志有力量。"),
    ("clever", "quick at learning and solving problems.", "聪明，学得快。"),
    ("friendly", "kind and easy to get along with.", "友好，容易相处。"),
    ("excited", "feeling very happy and eager.", "感到兴奋和期待。"),
    ("angry", "feeling mad about something.", "感到生气。"),
    ("calm", "peaceful and not upset.", "平静，不紧张。"),
    ("funny", "making people laugh.", "让人发笑。"),
    ("shy", "nervous around people you do not know well.", "在人前容易害羞。"),
    ("loud", "making a strong sound.", "声音很大。"),
    ("quiet", "making little or no sound.", "声音很小或安静。"),
    ("fast", "moving or happening quickly.", "移动或发生得很快。"),
    ("slow", "moving or happening with little speed.", "移动或发生得很慢。"),
    ("big", "large in size.", "体积大。"),
    ("small", "little in size.", "体积小。"),
    ("hot", "having a high temperature.", "温度高，很热。"),
    ("cold", "having a low temperature.", "温度低，很冷。"),
    ("safe", "free from danger.", "安全，没有危险。"),
    ("dangerous", "able to cause harm.", "危险，可能造成伤害。"),
];

/// How a fallback field shows its two languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    EnglishOnly,
    ChineseOnly,
    EnglishFirst,
    ChineseFirst,
}

impl Layout {
    fn for_options(options: &ExerciseOptions) -> Self {
        match (options.direction, options.style) {
            (None, _) => Layout::EnglishOnly,
            (Some(LearningDirection::Both), _) => Layout::EnglishFirst,
            (Some(LearningDirection::EnToZh), OutputStyle::Bilingual) => Layout::EnglishFirst,
            (Some(LearningDirection::ZhToEn), OutputStyle::Bilingual) => Layout::ChineseFirst,
            (Some(LearningDirection::EnToZh), OutputStyle::Immersion) => Layout::ChineseOnly,
            (Some(LearningDirection::ZhToEn), OutputStyle::Immersion) => Layout::EnglishOnly,
        }
    }

    fn render(self, english: &str, chinese: &str) -> String {
        match self {
            Layout::EnglishOnly => english.to_string(),
            Layout::ChineseOnly => chinese.to_string(),
            Layout::EnglishFirst => format!("{}\n{}", english, chinese),
            Layout::ChineseFirst => format!("{}\n{}", chinese, english),
        }
    }

    fn render_choices(self, english: [&str; 3], chinese: [&str; 3]) -> Choices {
        ChoiceKey::ALL
            .iter()
            .zip(english.iter().zip(chinese.iter()))
            .map(|(key, (en, zh))| (*key, self.render(en, zh)))
            .collect()
    }
}

const UNKNOWN_MEANING: (&str, &str) = (
    "Something you can see, do or feel in everyday life.",
    "日常生活中会遇到的事物、动作或感受。",
);

const NEUTRAL_EXAMPLE: (&str, &str) = (
    "We talked about a new word in class today.",
    "我们今天在课堂上学了一个新词。",
);

/// English and Chinese definitions of `word`. Unknown words get a neutral
/// description that never repeats the word, so it cannot echo placeholder phrasing.
pub fn fallback_definition(word: &str) -> (String, String) {
    let lookup = word.trim().to_lowercase();
    let (english, chinese) = MEANINGS
        .iter()
        .find(|(w, _, _)| *w == lookup)
        .map_or(UNKNOWN_MEANING, |(_, english, chinese)| (*english, *chinese));
    (english.to_string(), chinese.to_string())
}

pub fn fallback_exercise(word: &str, options: &ExerciseOptions) -> VocabExercise {
    let layout = Layout::for_options(options);
    let (meaning_en, meaning_zh) = fallback_definition(word);

    VocabExercise {
        definition: layout.render(&meaning_en, &meaning_zh),
        example_sentence: fallback_example(layout, word),
        quiz_question: layout.render(
            &format!("What does \"{}\" mean?", word),
            &format!("\"{}\" 是什么意思？", word),
        ),
        quiz_choices: layout.render_choices(
            [meaning_en.as_str(), "A kind of fruit.", "To move quickly."],
            [meaning_zh.as_str(), "一种水果。", "快速移动。"],
        ),
        quiz_answer: ChoiceKey::A,
    }
}

/// Names the word when that reads cleanly, otherwise a sentence without it.
fn fallback_example(layout: Layout, word: &str) -> String {
    let example = layout.render(
        &format!("The teacher explained \"{}\" in class today.", word),
        &format!("老师今天在课堂上讲解了\"{}\"。", word),
    );
    if looks_template_example(&example) {
        layout.render(NEUTRAL_EXAMPLE.0, NEUTRAL_EXAMPLE.1)
    } else {
        example
    }
}

const STORY_LINES: [(&str, &str); 4] = [
    ("Tina the turtle wanted to cross the garden.", "小乌龟蒂娜想穿过花园。"),
    ("She moved slowly and safely.", "她慢慢又安全地移动。"),
    ("A friendly bird cheered her on.", "一只友善的鸟为她加油。"),
    ("Tina reached the pond and felt proud.", "蒂娜到了池塘，感到很自豪。"),
];

struct FallbackQuestion {
    english: &'static str,
    chinese: &'static str,
    choices_en: [&'static str; 3],
    choices_zh: [&'static str; 3],
    question_type: QuestionType,
    explanation_en: &'static str,
    explanation_zh: &'static str,
    evidence: i64,
}

const STORY_QUESTIONS: [FallbackQuestion; 3] = [
    FallbackQuestion {
        english: "Who is the story about?",
        chinese: "故事讲的是谁？",
        choices_en: ["Tina the turtle", "A big lion", "A fast car"],
        choices_zh: ["小乌龟蒂娜", "大狮子", "快车"],
        question_type: QuestionType::Literal,
        explanation_en: "The first sentence says Tina the turtle wanted to cross the garden.",
        explanation_zh: "第一句说小乌龟蒂娜想穿过花园。",
        evidence: 0,
    },
    FallbackQuestion {
        english: "Where did Tina want to go?",
        chinese: "蒂娜想去哪里？",
        choices_en: ["The pond", "The moon", "The city"],
        choices_zh: ["池塘", "月亮", "城市"],
        question_type: QuestionType::Literal,
        explanation_en: "The story says Tina reached the pond.",
        explanation_zh: "故事说蒂娜到了池塘。",
        evidence: 3,
    },
    FallbackQuestion {
        english: "How did Tina feel at the end?",
        chinese: "最后蒂娜感觉如何？",
        choices_en: ["Proud", "Angry", "Sleepy"],
        choices_zh: ["自豪", "生气", "困了"],
        question_type: QuestionType::Inference,
        explanation_en: "When Tina reached the pond she felt proud.",
        explanation_zh: "蒂娜到了池塘时感到很自豪。",
        evidence: 3,
    },
];

const KEY_WORDS: [(&str, &str, &str); 3] = [
    ("proud", "pleased about something you did.", "为自己做到的事感到高兴。"),
    ("friendly", "kind and easy to get along with.", "友好，容易相处。"),
    ("safely", "without getting hurt.", "安全地，不受伤害。"),
];

/// The turtle story, laid out for `options`. Blocks always carry both languages.
pub fn fallback_story(options: &ExerciseOptions) -> GeneratedStory {
    let layout = Layout::for_options(options);

    let story_text = STORY_LINES
        .iter()
        .map(|(en, zh)| layout.render(en, zh))
        .collect::<Vec<_>>()
        .join("\n");

    let questions = STORY_QUESTIONS
        .iter()
        .map(|q| RawQuestion {
            question: layout.render(q.english, q.chinese),
            choices: layout.render_choices(q.choices_en, q.choices_zh),
            answer: ChoiceKey::A,
            question_type: Some(format!("{:?}", q.question_type).to_lowercase()),
            explanation_en: Some(q.explanation_en.to_string()),
            explanation_zh: Some(q.explanation_zh.to_string()),
            evidence_block_index: Some(q.evidence),
        })
        .collect();

    GeneratedStory {
        title: layout.render("The Brave Turtle", "勇敢的小乌龟"),
        story_text,
        blocks: STORY_LINES
            .iter()
            .map(|(en, zh)| StoryBlock {
                english: en.to_string(),
                chinese: zh.to_string(),
            })
            .collect(),
        key_vocabulary: KEY_WORDS
            .iter()
            .map(|(word, en, zh)| KeyVocabulary {
                word: word.to_string(),
                meaning_en: en.to_string(),
                meaning_zh: zh.to_string(),
            })
            .collect(),
        questions,
        image_description: "A small turtle walking through a sunny garden.".to_string(),
    }
}

/// Shape constraints every delivered exercise must meet: non-empty fields and
/// exactly three non-empty choices A, B and C with the answer among them.
pub fn ensure_exercise_shape(exercise: &VocabExercise) -> Result<()> {
    let fields = [
        ("definition", &exercise.definition),
        ("example_sentence", &exercise.example_sentence),
        ("quiz_question", &exercise.quiz_question),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(TutorError::validation(format!("fallback exercise has an empty {}", name)));
        }
    }
    if exercise.quiz_choices.len() != ChoiceKey::ALL.len()
        || exercise.quiz_choices.values().any(|c| c.trim().is_empty())
    {
        return Err(TutorError::validation(
            "fallback exercise needs three non-empty choices A, B and C",
        ));
    }
    if !exercise.quiz_choices.contains_key(&exercise.quiz_answer) {
        return Err(TutorError::validation("fallback exercise answer is not among its choices"));
    }
    Ok(())
}

/// At least one story block and exactly three complete questions.
pub fn ensure_story_shape(story: &ComprehensionExercise) -> Result<()> {
    let issues = assess_story(story);
    if issues.is_empty() {
        return Ok(());
    }
    let detail = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
    Err(TutorError::validation(format!("fallback story is malformed: {}", detail)))
}
