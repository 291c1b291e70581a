pub mod progress;

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use rand::Rng;

use crate::console;
use crate::domain::note::{MetadataSpec, NoteFilter, NoteList, NoteMeta, NoteParts, Notebook};
use crate::service::backoff::{BackoffPolicy, call_with_backoff};
use crate::service::{NoteStore, ServiceResult};
use crate::sync::progress::ProgressLog;
use crate::titledate;

/// Listing cap large enough to cover any realistic notebook in one call.
const MAX_NOTES: u32 = 999_999;

pub struct SyncConfig {
    pub batch_size: usize,
    pub backoff: BackoffPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Tally of one run. Flattened into the final summary, never persisted.
#[derive(Debug, Default)]
pub struct RunProgress {
    pub processed: u32,
    pub updated: u32,
    pub errors: Vec<String>,
}

/// Full run: connection check, notebook resolution, listing, confirmation,
/// batched processing, summary. Each stage is fatal on failure; per-note
/// errors inside the batch stage are collected instead.
pub fn run_sync(store: &dyn NoteStore, cfg: &SyncConfig, notebook: Option<&str>) -> Result<()> {
    let user = call_with_backoff(&cfg.backoff, || store.get_user())
        .map_err(|e| anyhow!("Error authenticating with the service: {e}"))?;
    println!("Connected as: {}", user.username);

    let notebook = resolve_notebook(store, &cfg.backoff, notebook)?;
    println!("Found notebook: {}", notebook.name);

    let listing = list_note_metadata(store, &cfg.backoff, &notebook.guid)?;
    let total = listing.total_notes;
    println!("Found {total} notes to process");

    if listing.notes.is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }

    let prompt = format!("Ready to update creation dates for {total} notes? (y/n): ");
    if !console::confirm(&prompt)? {
        println!("Operation cancelled.");
        return Ok(());
    }

    let mut log = ProgressLog::create_for_run()?;
    let outcome = process_notes(store, cfg, &listing.notes, total, &mut log, pace_between_batches);

    print_summary(&outcome, log.path());
    Ok(())
}

/// Resolve the target notebook: exact name match when one is configured,
/// numbered pick from the list otherwise.
pub fn resolve_notebook(
    store: &dyn NoteStore,
    policy: &BackoffPolicy,
    preset: Option<&str>,
) -> Result<Notebook> {
    let notebooks = call_with_backoff(policy, || store.list_notebooks())
        .map_err(|e| anyhow!("Error listing notebooks: {e}"))?;
    if notebooks.is_empty() {
        return Err(anyhow!("no notebooks available on this account"));
    }

    if let Some(name) = preset {
        if let Some(notebook) = notebooks.iter().find(|nb| nb.name == name) {
            return Ok(notebook.clone());
        }
        println!("Notebook '{name}' not found. Available notebooks:");
        for notebook in &notebooks {
            println!("- {}", notebook.name);
        }
        return Err(anyhow!("notebook '{name}' not found"));
    }

    println!("Available notebooks:");
    for (i, notebook) in notebooks.iter().enumerate() {
        println!("{}. {}", i + 1, notebook.name);
    }
    let pick = console::choose_index("Select a notebook: ", notebooks.len())?
        .ok_or_else(|| anyhow!("invalid notebook selection"))?;
    Ok(notebooks[pick].clone())
}

/// Fetch title-only metadata for every note in the notebook in one call.
pub fn list_note_metadata(
    store: &dyn NoteStore,
    policy: &BackoffPolicy,
    notebook_guid: &str,
) -> Result<NoteList> {
    let filter = NoteFilter::for_notebook(notebook_guid);
    let spec = MetadataSpec::titles();
    call_with_backoff(policy, || {
        store.find_notes_metadata(&filter, 0, MAX_NOTES, &spec)
    })
    .map_err(|e| anyhow!("Error retrieving notes: {e}"))
}

/// Walk the notes in fixed-size batches. A failing note is recorded and the
/// loop moves on; only the pacing pause runs between batches, never after
/// the last one. Every note gets a progress-log line, failed or not. A zero
/// batch size is treated as one.
pub fn process_notes<F>(
    store: &dyn NoteStore,
    cfg: &SyncConfig,
    notes: &[NoteMeta],
    total: u32,
    log: &mut ProgressLog,
    mut pause: F,
) -> RunProgress
where
    F: FnMut(),
{
    let batch_size = cfg.batch_size.max(1);
    let mut outcome = RunProgress::default();
    let batches = notes.len().div_ceil(batch_size);

    for (batch_index, batch) in notes.chunks(batch_size).enumerate() {
        println!("\nProcessing batch {} of {}...", batch_index + 1, batches);

        for meta in batch {
            outcome.processed += 1;
            match process_one(store, &cfg.backoff, meta, outcome.processed, total) {
                Ok(true) => outcome.updated += 1,
                Ok(false) => {}
                Err(err) => {
                    let error_msg = format!("Error processing note {}: {err}", meta.title);
                    println!("  → {error_msg}");
                    outcome.errors.push(error_msg);
                }
            }
            // audit trail is best-effort; a full disk must not stop the run
            if let Err(e) = log.record(outcome.processed, total, &meta.title) {
                log::warn!("could not append to progress log: {e}");
            }
        }

        if batch_index + 1 < batches {
            pause();
        }
    }

    outcome
}

/// One note: fetch minimal, compare against the title date, update only on
/// a real difference. Returns whether an update call was made.
fn process_one(
    store: &dyn NoteStore,
    policy: &BackoffPolicy,
    meta: &NoteMeta,
    position: u32,
    total: u32,
) -> ServiceResult<bool> {
    let note = call_with_backoff(policy, || store.get_note(&meta.guid, NoteParts::default()))?;

    let current = titledate::format_local_datetime(note.created);
    println!(
        "Processing {position}/{total}: {} (Current date: {current})",
        note.title
    );

    let Some(new_timestamp) = titledate::extract_created_millis(&note.title) else {
        println!("  → No valid date found in title, skipping");
        return Ok(false);
    };

    if new_timestamp == note.created {
        println!("  → Date already matches {current}, skipping");
        return Ok(false);
    }

    println!(
        "  → Updating to: {}",
        titledate::format_local_datetime(new_timestamp)
    );
    let mut changed = note;
    changed.created = new_timestamp;
    call_with_backoff(policy, || store.update_note(&changed))?;
    Ok(true)
}

/// Random pause between batches so sustained request pressure stays low,
/// independent of the rate-limit backoff.
fn pace_between_batches() {
    let delay = rand::thread_rng().gen_range(1.0..=2.0);
    println!("Waiting {delay:.1} seconds before next batch...");
    thread::sleep(Duration::from_secs_f64(delay));
}

fn print_summary(outcome: &RunProgress, log_path: &Path) {
    println!("\n====== SUMMARY ======");
    println!("Total notes processed: {}", outcome.processed);
    println!("Notes updated: {}", outcome.updated);
    println!("Errors encountered: {}", outcome.errors.len());
    println!("Progress log saved to: {}", log_path.display());

    if !outcome.errors.is_empty() {
        println!("\nErrors:");
        for error in &outcome.errors {
            println!("- {error}");
        }
    }
}
