//! Print the family tree resolved from the database, for operators.
//!
//! Usage: family-tree [--json] <generations|roots|duplicates|member ID>
//!   --json  : Print JSON instead of text

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use family_portal_api::{
    family::{find_duplicates, FamilyGraph},
    models::person::Person,
    services::persons::PersonService,
};

#[derive(Parser)]
#[command(name = "family-tree", about = "Inspect the family tree stored in the database")]
struct Args {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Members grouped by generation, unreached members last
    Generations,
    /// Members the tree starts from
    Roots,
    /// Groups of likely duplicate records
    Duplicates,
    /// Parents, spouse, siblings and children of one member
    Member { id: Uuid },
}

fn describe(p: &Person) -> String {
    let mut out = format!("{} [{}]", p.full_name(), p.id);
    match (p.date_of_birth, p.date_of_death) {
        (Some(b), Some(d)) => out.push_str(&format!(" {b} - {d}")),
        (Some(b), None) => out.push_str(&format!(" b. {b}")),
        (None, Some(d)) => out.push_str(&format!(" d. {d}")),
        (None, None) => {}
    }
    out
}

fn print_list(title: &str, people: &[&Person]) {
    println!("{title} ({})", people.len());
    for p in people {
        println!("  {}", describe(p));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    let members = PersonService::list(&pool).await?;
    let graph = FamilyGraph::new(&members);

    match args.command {
        Command::Generations => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&graph.build_generations())?);
                return Ok(());
            }
            let layout = graph.layout();
            for (depth, level) in layout.levels.iter().enumerate() {
                print_list(&format!("Generation {}", depth + 1), level);
            }
            if !layout.unreached.is_empty() {
                print_list("Not connected to any root", &layout.unreached);
            }
        }
        Command::Roots => {
            let roots = graph.root_members();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&roots)?);
            } else {
                print_list("Roots", &roots);
            }
        }
        Command::Duplicates => {
            let groups = find_duplicates(&members);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else if groups.is_empty() {
                println!("No duplicates found");
            } else {
                for group in &groups {
                    print_list(&group.label, &group.members);
                }
            }
        }
        Command::Member { id } => {
            let Some(person) = graph.get(id) else {
                anyhow::bail!("No family member with id {id}");
            };
            let spouse: Vec<&Person> = graph.spouse_of(person).into_iter().collect();
            if args.json {
                let body = serde_json::json!({
                    "member": person,
                    "parents": graph.parents_of(person),
                    "spouse": spouse.first(),
                    "siblings": graph.siblings_of(person),
                    "children": graph.children_of(person.id),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("{}", describe(person));
                print_list("Parents", &graph.parents_of(person));
                print_list("Spouse", &spouse);
                print_list("Siblings", &graph.siblings_of(person));
                print_list("Children", &graph.children_of(person.id));
            }
        }
    }

    Ok(())
}
