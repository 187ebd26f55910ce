use std::fmt;

use chrono::{DateTime, Utc};
use practice_core::model::{
    Difficulty, QuestionDraft, QuestionStatus, QuestionType, Topic, TopicId, Unit, UnitId,
};
use storage::repository::{QuestionRepository, Storage, UnitRepository};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    questions_per_tier: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidCount { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --questions value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("PRACTICE_DB_URL").unwrap_or_else(|_| "sqlite:practice.sqlite3".into());
        let mut questions_per_tier = std::env::var("PRACTICE_SEED_QUESTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(5);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    questions_per_tier = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            questions_per_tier,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>   SQLite URL (default: sqlite:practice.sqlite3)");
    eprintln!("  --questions <n>     Questions per unit and difficulty tier (default: 5)");
    eprintln!("  --now <rfc3339>     Fixed current time for deterministic seeding");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  PRACTICE_DB_URL, PRACTICE_SEED_QUESTIONS");
}

struct UnitSeed {
    number: u32,
    name: &'static str,
    description: &'static str,
    topics: &'static [&'static str],
}

const UNITS: &[UnitSeed] = &[
    UnitSeed {
        number: 1,
        name: "Primitive Types",
        description: "Integers, doubles, booleans, and expressions",
        topics: &["Variables", "Arithmetic", "Casting"],
    },
    UnitSeed {
        number: 2,
        name: "Using Objects",
        description: "Object references, constructors, and methods",
        topics: &["Constructors", "Method Calls"],
    },
    UnitSeed {
        number: 3,
        name: "Boolean Expressions and if Statements",
        description: "Branching and boolean logic",
        topics: &["Comparisons", "Compound Conditions"],
    },
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let mut question_count = 0_u32;
    let mut topic_id = 0_u64;
    for seed in UNITS {
        let unit = Unit {
            id: UnitId::new(u64::from(seed.number)),
            unit_number: seed.number,
            name: seed.name.into(),
            description: Some(seed.description.into()),
            icon: None,
            color: None,
            is_active: true,
        };
        storage.units.upsert_unit(&unit).await?;

        let mut topic_ids = Vec::with_capacity(seed.topics.len());
        for (index, topic_name) in seed.topics.iter().enumerate() {
            topic_id += 1;
            let topic = Topic {
                id: TopicId::new(topic_id),
                unit_id: unit.id,
                name: (*topic_name).into(),
                description: None,
                order_index: u32::try_from(index)?,
            };
            storage.units.upsert_topic(&topic).await?;
            topic_ids.push(topic.id);
        }

        for difficulty in Difficulty::ALL {
            for i in 0..args.questions_per_tier {
                let topic = topic_ids
                    .get(i as usize % topic_ids.len().max(1))
                    .copied();
                let draft = sample_question(&unit, topic, difficulty, i);
                storage
                    .questions
                    .insert_question(&draft.validate(now)?)
                    .await?;
                question_count += 1;
            }
        }
    }

    println!(
        "Seeded {} units with {} questions into {}",
        UNITS.len(),
        question_count,
        args.db_url
    );

    Ok(())
}

fn sample_question(
    unit: &Unit,
    topic_id: Option<TopicId>,
    difficulty: Difficulty,
    index: u32,
) -> QuestionDraft {
    let correct = format!("Correct answer {index}");
    QuestionDraft {
        unit_id: unit.id,
        topic_id,
        question_text: format!(
            "[{}] Practice question {} for {}",
            difficulty, index, unit.name
        ),
        code_snippet: None,
        options: vec![
            correct.clone(),
            format!("Distractor A{index}"),
            format!("Distractor B{index}"),
            format!("Distractor C{index}"),
        ],
        correct_answer: correct,
        explanation: format!("Seeded explanation for question {index}."),
        question_type: QuestionType::MultipleChoice,
        difficulty,
        status: QuestionStatus::Approved,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
