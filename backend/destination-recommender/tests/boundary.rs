use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if let Ok(read_dir) = fs::read_dir(&dir) {
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
                    files.push(path);
                }
            }
        }
    }
    files
}

fn offenders(dir: &str, needles: &[&str]) -> Vec<String> {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(dir);
    collect_rs_files(&root)
        .into_iter()
        .filter(|file| {
            fs::read_to_string(file)
                .map(|c| needles.iter().any(|n| c.contains(n)))
                .unwrap_or(false)
        })
        .map(|file| file.to_string_lossy().to_string())
        .collect()
}

#[test]
fn scoring_services_only_reach_the_database_through_stores() {
    let found = offenders("src/services", &["sqlx::", "PgPool"]);
    assert!(
        found.is_empty(),
        "Services must use the db store traits, not SQL. Offenders: {:?}",
        found
    );
}

#[test]
fn handlers_do_not_call_scorers_directly() {
    let found = offenders(
        "src/handlers",
        &["CollaborativeScorer", "ContentScorer", "QueryExpander"],
    );
    assert!(
        found.is_empty(),
        "Handlers must go through HybridRecommender. Offenders: {:?}",
        found
    );
}
