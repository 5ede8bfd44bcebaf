//! Siteforge command-line front end.
//!
//! Submits website descriptions to the generation service, follows jobs to
//! completion, and manages the gallery of finished projects.

use std::env;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use log::LevelFilter;
use siteforge_client::{ClientSettings, ForgeHandle, JobEvent};
use siteforge_core::{JobStatus, ProjectRecord, StatusFilter};

const USAGE: &str = "\
Usage: siteforge <command> [args]

Commands:
  generate <description> [requirement]...   submit and follow a generation
  list                                      refresh and print all projects
  gallery [search] [status]                 filtered view of the collection
  delete <project-id>                       delete a project
  preview <project-id>                      start a preview session
  stop-preview <project-id>                 stop a preview session
  download <project-id>                     print the download URL
  files <project-id>                        list a project's generated files

The service root defaults to http://127.0.0.1:8000/api/v1 and can be
overridden with SITEFORGE_BASE_URL.";

fn main() -> Result<()> {
    client_logging::initialize(LevelFilter::Info);

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{USAGE}");
        return Ok(());
    };

    let settings = settings_from_env()?;
    let runtime = tokio::runtime::Runtime::new().context("tokio runtime")?;
    let handle = ForgeHandle::new(settings).map_err(|err| anyhow!("connect: {err}"))?;

    match command {
        "generate" => {
            let description = args
                .get(1)
                .filter(|text| !text.trim().is_empty())
                .ok_or_else(|| anyhow!("generate needs a website description"))?;
            let requirements = args.iter().skip(2).cloned().collect();
            generate(&runtime, &handle, description, requirements)
        }
        "list" => {
            runtime
                .block_on(handle.refresh())
                .map_err(|err| anyhow!("refresh: {err}"))?;
            print_records(&handle.projects());
            Ok(())
        }
        "gallery" => {
            let search = args.get(1).map(String::as_str).unwrap_or("");
            let filter = StatusFilter::parse(args.get(2).map(String::as_str).unwrap_or("all"));
            runtime
                .block_on(handle.refresh())
                .map_err(|err| anyhow!("refresh: {err}"))?;
            print_records(&handle.gallery(search, filter));
            Ok(())
        }
        "delete" => {
            let id = required_id(&args)?;
            runtime
                .block_on(handle.delete(id))
                .map_err(|err| anyhow!("{err}"))?;
            println!("deleted {id}");
            Ok(())
        }
        "preview" => {
            let id = required_id(&args)?;
            runtime
                .block_on(handle.refresh())
                .map_err(|err| anyhow!("refresh: {err}"))?;
            let session = runtime
                .block_on(handle.preview(id))
                .map_err(|err| anyhow!("{err}"))?;
            println!("preview for {id} is live at {}", session.url);
            Ok(())
        }
        "stop-preview" => {
            let id = required_id(&args)?;
            runtime.block_on(handle.stop_preview(id));
            println!("preview for {id} stopped");
            Ok(())
        }
        "download" => {
            let id = required_id(&args)?;
            // Opening the URL is left to the caller's browser or fetcher.
            println!("{}", handle.download_url(id));
            Ok(())
        }
        "files" => {
            let id = required_id(&args)?;
            let files = runtime
                .block_on(handle.project_files(id))
                .map_err(|err| anyhow!("files: {err}"))?;
            if files.is_empty() {
                println!("no files recorded for {id}");
            }
            for (file_path, content) in &files {
                println!("{file_path} ({} bytes)", content.len());
            }
            Ok(())
        }
        other => bail!("unknown command `{other}`\n\n{USAGE}"),
    }
}

fn settings_from_env() -> Result<ClientSettings> {
    match env::var("SITEFORGE_BASE_URL") {
        Ok(raw) => ClientSettings::for_base_url(&raw).map_err(|err| anyhow!("base url: {err}")),
        Err(_) => Ok(ClientSettings::default()),
    }
}

fn required_id(args: &[String]) -> Result<&str> {
    args.get(1)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("this command needs a project id"))
}

/// Submits a generation request and pumps job events until the job
/// reaches a terminal status.
fn generate(
    runtime: &tokio::runtime::Runtime,
    handle: &ForgeHandle,
    description: &str,
    requirements: Vec<String>,
) -> Result<()> {
    let id = runtime
        .block_on(handle.submit(description, requirements, serde_json::Value::Null))
        .map_err(|err| anyhow!("{err}"))?;
    println!("submitted as {id}; waiting for the generation to finish");

    let mut last_line = String::new();
    loop {
        while let Some(event) = handle.try_recv() {
            match event {
                JobEvent::Progress(job) => {
                    let line = format!(
                        "[{:>3}%] {} {}",
                        job.display_progress(),
                        job.status(),
                        job.current_step()
                    );
                    if line != last_line {
                        println!("{line}");
                        last_line = line;
                    }
                }
                JobEvent::Finished { project_id, status } => {
                    return report_outcome(handle, &project_id, status);
                }
            }
        }
        thread::sleep(Duration::from_millis(100));
    }
}

fn report_outcome(handle: &ForgeHandle, project_id: &str, status: JobStatus) -> Result<()> {
    match status {
        JobStatus::Completed => {
            println!("generation completed");
            if let Some(record) = handle
                .projects()
                .into_iter()
                .find(|record| record.id == project_id)
            {
                print_records(&[record]);
            }
            println!("download: {}", handle.download_url(project_id));
            Ok(())
        }
        _ => bail!("generation of {project_id} ended with status {status}"),
    }
}

fn print_records(records: &[ProjectRecord]) {
    if records.is_empty() {
        println!("no projects");
        return;
    }
    for record in records {
        let title = if record.title.is_empty() {
            &record.description
        } else {
            &record.title
        };
        println!(
            "{}  {:<10} {:>3} files  {}  {}",
            record.id,
            record.status.to_string(),
            record.file_count,
            display_time(&record.created_at),
            title
        );
    }
    println!("{} project(s)", records.len());
}

/// ISO-8601 timestamps are display-only; anything unparseable prints
/// as-is. The service emits naive local timestamps, older records may
/// carry an offset.
fn display_time(raw: &str) -> String {
    if raw.is_empty() {
        return "-".to_string();
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|parsed| parsed.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
