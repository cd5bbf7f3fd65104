use psynorm_build::BuildConfig;
use psynorm_kernel::NormsError;
use psynorm_table::NormsTable;
use serde::Serialize;
use std::path::Path;

pub fn load_config_or_exit(config: Option<&str>) -> BuildConfig {
    BuildConfig::load_or_builtin(config.map(Path::new)).unwrap_or_else(|e| exit_with(&e))
}

/// Unlike the build (where a missing table starts empty), checks need a
/// table that exists.
pub fn load_table_or_exit(path: &str, label: &str) -> NormsTable {
    if !Path::new(path).exists() {
        eprintln!("error: {label} table not found: {path}");
        std::process::exit(1);
    }
    NormsTable::load(path).unwrap_or_else(|e| exit_with(&e))
}

pub fn exit_with(error: &NormsError) -> ! {
    eprintln!("error: [{}] {error}", error.class());
    std::process::exit(1);
}

pub fn print_json_or_exit<T: Serialize>(value: &T, label: &str) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("error: failed to render {label} payload: {e}");
        std::process::exit(2);
    });
    println!("{rendered}");
}

pub fn yes_no(ok: bool) -> &'static str {
    if ok { "yes" } else { "no" }
}
