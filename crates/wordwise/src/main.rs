// wordwise/crates/wordwise/src/main.rs

#[cfg(feature = "cli")]
mod cli {
    use anyhow::{anyhow, bail, Context, Result};
    use chrono::Utc;
    use clap::{Parser, Subcommand};
    use serde::Serialize;
    use serde_json::json;
    use std::sync::Arc;
    use tracing::info;

    use wordwise::learner_db::parse_study_date;
    use wordwise::{
        telemetry, Config, ExerciseKind, ExerciseOptions, ExerciseService, LearnerDatabase,
        LearningDirection, OutputStyle, Recommender, StoryLevel,
    };

    #[derive(Parser)]
    #[command(name = "wordwise")]
    #[command(about = "Learner progress, practice recommendations and exercise generation", long_about = None)]
    #[command(version)]
    struct Cli {
        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Record one exercise attempt
        Record {
            learner: String,
            word: String,
            #[arg(short, long, value_enum, default_value_t = ExerciseKind::Quiz)]
            kind: ExerciseKind,
            /// Score in 0..=100
            #[arg(short, long)]
            score: i64,
            #[arg(short, long)]
            correct: bool,
        },
        /// Show recent attempts, newest first
        History {
            learner: String,
            #[arg(short, long, default_value = "20")]
            limit: usize,
        },
        /// Accuracy, per-kind averages and weak words
        Summary { learner: String },
        /// Pick the next words to practice from a candidate list
        Recommend {
            learner: String,
            /// Candidate words, in preference order; defaults to the learner's custom list
            candidates: Vec<String>,
            #[arg(short, long, default_value = "5")]
            limit: usize,
        },
        /// Custom word lists
        Words {
            #[command(subcommand)]
            command: WordsCommands,
        },
        /// Study time tracking
        Study {
            #[command(subcommand)]
            command: StudyCommands,
        },
        /// Generate a vocabulary exercise
        Vocab {
            word: String,
            #[arg(short, long)]
            learner: Option<String>,
            #[command(flatten)]
            options: OptionArgs,
        },
        /// Generate a reading-comprehension story
        Story {
            #[arg(long, value_enum, default_value = "intermediate")]
            level: StoryLevel,
            #[arg(short, long)]
            theme: Option<String>,
            #[arg(short, long)]
            learner: Option<String>,
            #[command(flatten)]
            options: OptionArgs,
        },
        /// Newest archived exercises or stories
        Archive {
            /// vocab_exercise or comprehension_story
            #[arg(default_value = "vocab_exercise")]
            doc_type: String,
            #[arg(short, long, default_value = "10")]
            limit: usize,
        },
        /// List learner profiles
        Learners,
        /// Delete a learner and all of their data
        Wipe { learner: String },
        /// Database statistics
        Stats,
    }

    #[derive(Subcommand)]
    enum StudyCommands {
        /// Add study seconds to a day
        Add {
            learner: String,
            seconds: i64,
            /// YYYY-MM-DD, defaults to today (UTC)
            #[arg(short, long)]
            date: Option<String>,
        },
        /// Day, week, month and lifetime totals
        Summary {
            learner: String,
            #[arg(short, long)]
            date: Option<String>,
        },
    }

    #[derive(Subcommand)]
    enum WordsCommands {
        /// Append words to the learner's list
        Add {
            learner: String,
            #[arg(required = true)]
            words: Vec<String>,
            #[arg(long)]
            list_name: Option<String>,
        },
        /// Replace the learner's whole list
        Replace {
            learner: String,
            words: Vec<String>,
            #[arg(long)]
            list_name: Option<String>,
        },
        /// Show the learner's list
        List { learner: String },
    }

    #[derive(clap::Args)]
    struct OptionArgs {
        #[arg(long, value_enum)]
        direction: Option<LearningDirection>,
        #[arg(long, value_enum, default_value = "immersion")]
        style: OutputStyle,
    }

    impl OptionArgs {
        fn to_options(&self) -> ExerciseOptions {
            ExerciseOptions {
                direction: self.direction,
                style: self.style,
            }
        }
    }

    fn print_json<T: Serialize>(value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn known_learner(db: &LearnerDatabase, name: &str) -> Result<i64> {
        db.learners
            .find(name)?
            .map(|learner| learner.id)
            .ok_or_else(|| anyhow!("unknown learner: {:?}", name))
    }

    fn study_date(raw: Option<&str>) -> Result<chrono::NaiveDate> {
        match raw {
            Some(raw) => Ok(parse_study_date(raw)?),
            None => Ok(Utc::now().date_naive()),
        }
    }

    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        telemetry::init_tracing();

        let cfg = Config::from_env()?;
        cfg.print_config();

        let db = Arc::new(
            LearnerDatabase::new(&cfg.database_path)
                .with_context(|| format!("opening {}", cfg.database_path.display()))?,
        );

        match cli.command {
            Commands::Record {
                learner,
                word,
                kind,
                score,
                correct,
            } => {
                let learner = db.learners.get_or_create(&learner)?;
                let attempt = db.ledger.record(learner.id, &word, kind, score, correct)?;
                print_json(&attempt)
            }
            Commands::History { learner, limit } => {
                let learner_id = known_learner(&db, &learner)?;
                print_json(&db.ledger.history(learner_id, limit)?)
            }
            Commands::Summary { learner } => {
                let learner_id = known_learner(&db, &learner)?;
                print_json(&db.ledger.summary(learner_id, cfg.policy.weak_score_below)?)
            }
            Commands::Recommend {
                learner,
                candidates,
                limit,
            } => {
                let learner = db.learners.get_or_create(&learner)?;
                let candidates = if candidates.is_empty() {
                    db.custom_vocab.list(learner.id)?
                } else {
                    candidates
                };
                if candidates.is_empty() {
                    bail!("no candidate words given and {:?} has no custom word list", learner.name);
                }
                let words = Recommender::new(&db.ledger, cfg.policy).recommend(learner.id, candidates.as_slice(), limit)?;
                print_json(&words)
            }
            Commands::Words { command } => match command {
                WordsCommands::Add {
                    learner,
                    words,
                    list_name,
                } => {
                    let learner = db.learners.get_or_create(&learner)?;
                    let saved = db.custom_vocab.add(learner.id, words.as_slice(), list_name.as_deref())?;
                    print_json(&json!({ "saved": saved.len(), "words": saved }))
                }
                WordsCommands::Replace {
                    learner,
                    words,
                    list_name,
                } => {
                    let learner = db.learners.get_or_create(&learner)?;
                    let saved = db.custom_vocab.replace(learner.id, words.as_slice(), list_name.as_deref())?;
                    print_json(&json!({ "saved": saved.len(), "words": saved }))
                }
                WordsCommands::List { learner } => {
                    let learner_id = known_learner(&db, &learner)?;
                    print_json(&db.custom_vocab.list(learner_id)?)
                }
            },
            Commands::Study { command } => match command {
                StudyCommands::Add {
                    learner,
                    seconds,
                    date,
                } => {
                    let learner = db.learners.get_or_create(&learner)?;
                    let date = study_date(date.as_deref())?;
                    let day_seconds = db.study_time.add(learner.id, date, seconds)?;
                    print_json(&json!({ "date": date, "day_seconds": day_seconds }))
                }
                StudyCommands::Summary { learner, date } => {
                    let learner_id = known_learner(&db, &learner)?;
                    let date = study_date(date.as_deref())?;
                    print_json(&db.study_time.summary(learner_id, date)?)
                }
            },
            Commands::Vocab {
                word,
                learner,
                options,
            } => {
                let learner_id = match learner {
                    Some(name) => Some(db.learners.get_or_create(&name)?.id),
                    None => None,
                };
                let service = ExerciseService::from_config(Arc::clone(&db), &cfg);
                let delivered = service.vocab_exercise(&word, learner_id, options.to_options()).await?;
                print_json(&delivered)
            }
            Commands::Story {
                level,
                theme,
                learner,
                options,
            } => {
                let learner_id = match learner {
                    Some(name) => Some(db.learners.get_or_create(&name)?.id),
                    None => None,
                };
                let service = ExerciseService::from_config(Arc::clone(&db), &cfg);
                let delivered = service
                    .comprehension_exercise(
                        level,
                        theme.as_deref(),
                        learner_id,
                        options.to_options(),
                    )
                    .await?;
                print_json(&delivered)
            }
            Commands::Archive { doc_type, limit } => print_json(&db.documents.list_by_type(&doc_type, limit)?),
            Commands::Learners => print_json(&db.learners.list()?),
            Commands::Wipe { learner } => {
                let learner_id = known_learner(&db, &learner)?;
                let wiped = db.ledger.wipe(learner_id)?;
                info!("Wipe of {:?} finished: {}", learner, wiped);
                print_json(&json!({ "learner": learner, "wiped": wiped }))
            }
            Commands::Stats => print_json(&json!({
                "schema_version": db.schema_version()?,
                "database": db.get_stats()?,
                "documents": db.documents.get_stats()?,
            })),
        }
    }

}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
