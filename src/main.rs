//! Thin CLI glue around the bugsight core. Argument handling here only
//! delivers `(report_path, project_root)` or `(bug_text, prompt_text)`
//! pairs to the library; all logic lives in the crate modules.

use std::path::{Path, PathBuf};

use bugsight::config::EngineConfig;
use bugsight::error::AppError;
use bugsight::inspector::CodeInspector;
use bugsight::llm::openai::OpenAiClient;
use bugsight::revision::{
    apply_suggestions, compute_diff, render_revision_report, RevisionEngine,
};
use bugsight::{logging, report, testplan};

const USAGE: &str = "Usage:
  bugsight revise <report.json> <project_root> [--apply] [--no-backup]
  bugsight inspect <report.json> <project_root> [--apply] [--no-backup]
  bugsight plan <bug.txt> <prompt.txt>";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("revise") => revise(&args[1..]).await,
        Some("inspect") => inspect(&args[1..]),
        Some("plan") => plan(&args[1..]).await,
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        tracing::error!(kind = e.kind(), "{e}");
        std::process::exit(1);
    }
}

fn expect_paths(args: &[String]) -> Result<(PathBuf, PathBuf), AppError> {
    match (args.first(), args.get(1)) {
        (Some(a), Some(b)) => Ok((PathBuf::from(a), PathBuf::from(b))),
        _ => Err(AppError::Validation(USAGE.to_string())),
    }
}

async fn revise(args: &[String]) -> Result<(), AppError> {
    let (report_path, project_root) = expect_paths(args)?;
    let apply = args.iter().any(|a| a == "--apply");
    let backup = !args.iter().any(|a| a == "--no-backup");

    let config = EngineConfig::from_env()?;
    let client = OpenAiClient::new(config)?;
    let engine = RevisionEngine::new(Box::new(client));

    let suggestions = engine
        .analyze_and_fix_failures(&report_path, &project_root)
        .await?;

    if suggestions.is_empty() {
        println!("No revisions generated.");
        return Ok(());
    }

    if apply {
        let results = apply_suggestions(&suggestions, backup);
        let rendered = render_revision_report(&suggestions, &results);
        let out_path = project_root.join("ai_revision_report.md");
        std::fs::write(&out_path, rendered)?;
        println!(
            "Applied {}/{} revisions; report written to {}",
            results.values().filter(|ok| **ok).count(),
            suggestions.len(),
            out_path.display()
        );
    } else {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
    }

    Ok(())
}

fn inspect(args: &[String]) -> Result<(), AppError> {
    let (report_path, project_root) = expect_paths(args)?;
    let apply = args.iter().any(|a| a == "--apply");
    let backup = !args.iter().any(|a| a == "--no-backup");

    let parsed = report::parse_report_file(&report_path)?;
    let inspector = CodeInspector::scan(&project_root);
    let issues = inspector.analyze(&parsed.failures);
    let mut suggestions = inspector.generate_revisions(issues.clone());
    for suggestion in &mut suggestions {
        suggestion.diff = Some(compute_diff(
            &suggestion.file_path,
            &suggestion.original_text,
            &suggestion.revised_text,
        ));
    }

    if apply {
        let results = apply_suggestions(&suggestions, backup);
        let rendered = render_revision_report(&suggestions, &results);
        let out_path = project_root.join("ai_revision_report.md");
        std::fs::write(&out_path, rendered)?;
        println!(
            "Applied {}/{} static revisions; report written to {}",
            results.values().filter(|ok| **ok).count(),
            suggestions.len(),
            out_path.display()
        );
    } else {
        let output = serde_json::json!({
            "issues": issues,
            "suggestions": suggestions,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

async fn plan(args: &[String]) -> Result<(), AppError> {
    let (bug_path, prompt_path) = expect_paths(args)?;

    let bug_text = read_required(&bug_path)?;
    let prompt_text = read_required(&prompt_path)?;

    let config = EngineConfig::from_env()?;
    let client = OpenAiClient::new(config)?;

    let plan = testplan::process_bug_report(&client, &bug_text, prompt_text.trim()).await?;
    println!("{}", serde_json::to_string_pretty(&plan.test_cases)?);
    Ok(())
}

fn read_required(path: &Path) -> Result<String, AppError> {
    if !path.exists() {
        return Err(AppError::Validation(format!(
            "File not found: {}",
            path.display()
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}
