//! User Service - command line access to the users collection.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use eloquent::bson::Document;
use eloquent::store::mongo::MongoProvider;
use eloquent::{FindOptions, SortOrder};
use serde::Serialize;

use user_service_lib::config::UserServiceConfig;
use user_service_lib::repository::User;
use user_service_lib::service::UserService;

#[derive(Parser)]
#[command(name = "user-service")]
#[command(about = "User records in a MongoDB collection")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every user
    All {
        /// Sort by this field
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(long, requires = "sort_by")]
        desc: bool,
    },
    /// Show one user
    Find { id: String },
    /// Create a user
    Insert {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: i32,
    },
    /// Change the given fields of a user
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<i32>,
    },
    /// Remove a user
    Delete { id: String },
    /// Count users, optionally matching a JSON filter
    Count {
        #[arg(long)]
        filter: Option<String>,
    },
    /// One page of users, newest first
    Paginate {
        #[arg(long, default_value = "10")]
        limit: i64,
        #[arg(long, default_value = "1")]
        page: i64,
        /// JSON filter, e.g. '{"age": {"$gte": 30}}'
        #[arg(long)]
        filter: Option<String>,
    },
    /// Users younger than AGE
    Underage { age: i32 },
    /// Users older than AGE
    Overage { age: i32 },
}

fn parse_filter(filter: Option<String>) -> Result<Option<Document>, serde_json::Error> {
    filter.map(|raw| serde_json::from_str::<Document>(&raw)).transpose()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    common::init_tracing(cli.verbose);

    let config = UserServiceConfig::from_env()?;
    let provider = MongoProvider::connect_with(&config.store).await?;
    let service = user_service_lib::build_service(Arc::new(provider.clone()), &config);

    match cli.command {
        Commands::All { sort_by, desc } => {
            let options = sort_by.map(|field| {
                let order = if desc { SortOrder::Descending } else { SortOrder::Ascending };
                FindOptions::new().sort_by(field, order)
            });
            print_json(&service.all(options).await?)?;
        }
        Commands::Find { id } => {
            print_json(&service.find(&id).await?)?;
        }
        Commands::Insert { name, age } => {
            let id = service.insert(User::new(name, age)).await?;
            print_json(&serde_json::json!({ "id": id }))?;
        }
        Commands::Update { id, name, age } => {
            let data = User {
                id: Some(id),
                name,
                age,
                ..Default::default()
            };
            let modified = service.update(data).await?;
            print_json(&serde_json::json!({ "modified": modified }))?;
        }
        Commands::Delete { id } => {
            let deleted = service.delete(&id).await?;
            print_json(&serde_json::json!({ "deleted": deleted }))?;
        }
        Commands::Count { filter } => {
            let total = service.count(parse_filter(filter)?).await?;
            print_json(&serde_json::json!({ "total": total }))?;
        }
        Commands::Paginate { limit, page, filter } => {
            print_json(&service.paginate(limit, page, parse_filter(filter)?).await?)?;
        }
        Commands::Underage { age } => {
            print_json(&service.underage(age).await?)?;
        }
        Commands::Overage { age } => {
            print_json(&service.overage(age).await?)?;
        }
    }

    provider.shutdown().await;
    Ok(())
}
