//! `fabula config show`: resolves and prints the operator config the server and
//! CLI would actually run with, after applying `fabula_config::load_and_apply`.

const INSPECTED_KEYS: &[&str] = &[
    "FABULA_DATA_DIR",
    "FABULA_LLM_MODEL",
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
    "OPENAI_EMBEDDING_MODEL",
    "LOG_FILE",
    "RUST_LOG",
];

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    fabula_config::load_and_apply("fabula", None)?;
    for key in INSPECTED_KEYS {
        match std::env::var(key) {
            Ok(value) if *key == "OPENAI_API_KEY" => {
                println!("{key}=<set, {} chars>", value.len());
            }
            Ok(value) => println!("{key}={value}"),
            Err(_) => println!("{key}=<unset>"),
        }
    }
    Ok(())
}
