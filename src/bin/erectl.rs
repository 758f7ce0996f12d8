use clap::{Parser, Subcommand};
use erenodes_api::nodes::concat::{join_prompt, join_tag_list};
use erenodes_api::nodes::filter::{filter_prompt, normalize, AliasPolicy};
use erenodes_api::nodes::lora_stack::extract_lora_stack;
use erenodes_api::tags::{load_tags_from_csv, TagStore, TagVocabulary};
use erenodes_api::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "erectl", about = "CLI for the EreNodes prompt tools", version)]
struct Cli {
    /// Override AUTOCOMPLETE_DIR
    #[arg(global = true, long)]
    autocomplete_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Filter a prompt against a tag vocabulary CSV
    Filter {
        /// Raw prompt text
        prompt: String,
        /// CSV filename under the autocomplete dir, or an explicit path
        #[arg(long)]
        csv: PathBuf,
        /// Alias handling: "Use alias", "Use main", or "Use both"
        #[arg(long, default_value = "Use alias")]
        alias_handling: String,
    },
    /// Extract a LoRA stack from prompt text
    Lora {
        /// Prompt text containing <lora:name:strength> tokens
        prompt: String,
    },
    /// Join a prefix and a prompt body
    Concat {
        text: String,
        #[arg(long, default_value = "")]
        prefix: String,
        /// Separator; literal \n becomes a line break
        #[arg(long, default_value = "")]
        separator: String,
        /// Treat the body as a comma-separated tag list
        #[arg(long)]
        tag_list: bool,
    },
    /// Search a vocabulary CSV for tags matching a query
    SearchTags {
        query: String,
        /// CSV filename under the autocomplete dir
        #[arg(long)]
        csv: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List CSV vocabularies in the autocomplete dir
    ListCsv,
}

#[tokio::main]
async fn main() {
    Config::dotenv_load();
    let config = Config::new().expect("Failed to load configuration");
    let cli = Cli::parse();
    let autocomplete_dir = cli
        .autocomplete_dir
        .unwrap_or_else(|| config.autocomplete_dir.clone());
    let store = TagStore::new(&autocomplete_dir, &config.csv_cache_dir);

    match cli.command {
        Commands::Filter {
            prompt,
            csv,
            alias_handling,
        } => {
            let policy = AliasPolicy::from_label(&alias_handling).unwrap_or_else(|| {
                eprintln!(
                    "Unknown alias handling '{}', using '{}'",
                    alias_handling,
                    AliasPolicy::UseAlias.label()
                );
                AliasPolicy::UseAlias
            });
            let csv_path = if csv.is_absolute() || csv.exists() {
                csv
            } else {
                PathBuf::from(&autocomplete_dir).join(csv)
            };
            match load_tags_from_csv(&csv_path) {
                Ok(records) => {
                    let vocab = TagVocabulary::from_records(&records);
                    println!("{}", filter_prompt(&prompt, &vocab, policy));
                }
                Err(e) => {
                    eprintln!("Could not read {}: {}", csv_path.display(), e);
                    println!("{}", normalize(&prompt));
                }
            }
        }
        Commands::Lora { prompt } => {
            let (stack, text) = extract_lora_stack(&prompt);
            for entry in &stack {
                println!(
                    "{}\t{}\t{}",
                    entry.name, entry.model_strength, entry.clip_strength
                );
            }
            println!("{}", text);
        }
        Commands::Concat {
            text,
            prefix,
            separator,
            tag_list,
        } => {
            if tag_list {
                println!("{}", join_tag_list(&text, &prefix));
            } else {
                println!("{}", join_prompt(&text, &prefix, &separator));
            }
        }
        Commands::SearchTags { query, csv, limit } => {
            for record in store.search(&csv, &query, limit).await {
                println!("{}\t{}\t{}", record.name, record.count, record.aliases.join(","));
            }
        }
        Commands::ListCsv => {
            for name in store.list_csv_files() {
                println!("{}", name);
            }
        }
    }
}
