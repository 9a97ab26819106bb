use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::chatguru::types::non_blank;
use crate::chatguru::{ContactRequest, PollPolicy, RegistrationApi, poll_status};
use crate::config::AppConfig;
use crate::interrupt;
use crate::sheet::{ContactRow, RowStatus, Sheet, SheetStore};
use crate::ui::RowProgress;

/// Which pass over the sheet a run performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Register,
    Check,
}

/// Structured record produced at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub mode: RunMode,
    pub total_rows: usize,
    pub registered: usize,
    pub failed: usize,
    pub polled: usize,
    pub skipped: usize,
    pub save_failures: usize,
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunSummary {
    fn start(mode: RunMode, total_rows: usize) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4().to_string(),
            mode,
            total_rows,
            registered: 0,
            failed: 0,
            polled: 0,
            skipped: 0,
            save_failures: 0,
            interrupted: false,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    fn finish(mut self, token: &CancellationToken) -> Self {
        self.finished_at = Utc::now();
        self.duration_ms = (self.finished_at - self.started_at).num_milliseconds();
        self.interrupted = token.is_cancelled();
        self
    }
}

/// Tunables of the row loops.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Wait between submitted rows (rate-limit back-pressure).
    pub row_delay: Duration,
    /// Wait between polled rows.
    pub poll_row_delay: Duration,
    pub poll_policy: PollPolicy,
    /// Name sent for rows whose name cell is blank.
    pub default_name: String,
    /// Phone used for rows whose phone cell is blank.
    pub default_phone_id: String,
    pub show_progress: bool,
}

impl LoopSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            row_delay: config.row_delay(),
            poll_row_delay: config.poll_row_delay(),
            poll_policy: config.poll_policy(),
            default_name: config.default_name.clone(),
            default_phone_id: config.phone_id.clone(),
            show_progress: true,
        }
    }
}

/// Drives sheet rows through the remote registration protocol, persisting
/// the sheet after every row it changes.
pub struct Reconciler<'a, A, S> {
    api: &'a A,
    store: &'a S,
    token: CancellationToken,
    settings: LoopSettings,
}

impl<'a, A: RegistrationApi, S: SheetStore> Reconciler<'a, A, S> {
    pub fn new(api: &'a A, store: &'a S, token: CancellationToken, settings: LoopSettings) -> Self {
        Self {
            api,
            store,
            token,
            settings,
        }
    }

    /// Submit every `Pending` row in sheet order.
    ///
    /// Rows marked as failed or already processed are left untouched. The
    /// loop stops at the top of an iteration once the token is cancelled, so
    /// the next run resumes at the first row still pending.
    pub async fn process_pending(&self, sheet: &mut Sheet) -> RunSummary {
        let mut summary = RunSummary::start(RunMode::Register, sheet.len());
        if sheet.is_empty() {
            info!("no rows found in sheet, nothing to register");
            return summary.finish(&self.token);
        }

        let total = sheet.len();
        let progress = RowProgress::new(total, "registering", self.settings.show_progress);

        for index in 0..total {
            if self.token.is_cancelled() {
                warn!(row = index + 1, "stopping, remaining rows are kept for the next run");
                break;
            }
            let line = index + 1;

            match sheet.rows()[index].state() {
                RowStatus::Pending => {}
                RowStatus::Failed => {
                    debug!(row = line, "skipping row due to previous error");
                    progress.skipped(line, "previous error");
                    summary.skipped += 1;
                    progress.advance();
                    continue;
                }
                other => {
                    debug!(row = line, status = %other, "skipping row already processed");
                    progress.skipped(line, &format!("already processed ({other})"));
                    summary.skipped += 1;
                    progress.advance();
                    continue;
                }
            }

            let request = self.contact_request(&sheet.rows()[index]);
            let result = self.api.submit(&request).await;
            let row = sheet.row_mut(index);
            match result {
                Ok(registration_id) => {
                    info!(row = line, chat_number = %request.chat_number, %registration_id, "contact submitted");
                    progress.registered(line, &request.name, &registration_id);
                    row.mark_registered(registration_id);
                    summary.registered += 1;
                }
                Err(e) => {
                    warn!(row = line, chat_number = %request.chat_number, error = %e, "contact rejected");
                    progress.failed(line, &request.name, &e.to_string());
                    row.mark_failed(e.to_string());
                    summary.failed += 1;
                }
            }

            self.persist(sheet, line, &mut summary);
            progress.advance();

            if index + 1 < total && !self.token.is_cancelled() {
                debug!(delay_ms = self.settings.row_delay.as_millis() as u64, "waiting before next row");
                interrupt::pause(self.settings.row_delay, &self.token).await;
            }
        }

        progress.finish();
        summary.finish(&self.token)
    }

    /// Poll every row carrying a registration id and store the result text.
    pub async fn poll_pending_rows(&self, sheet: &mut Sheet) -> RunSummary {
        let mut summary = RunSummary::start(RunMode::Check, sheet.len());
        if sheet.is_empty() {
            info!("no rows found in sheet, nothing to check");
            return summary.finish(&self.token);
        }

        let total = sheet.len();
        let progress = RowProgress::new(total, "checking", self.settings.show_progress);

        for index in 0..total {
            if self.token.is_cancelled() {
                warn!(row = index + 1, "stopping, remaining rows are kept for the next run");
                break;
            }
            let line = index + 1;

            let row = &sheet.rows()[index];
            let Some(registration_id) = row.pollable_id().map(str::to_string) else {
                debug!(row = line, "skipping row without registration id");
                summary.skipped += 1;
                progress.advance();
                continue;
            };
            let phone_id = self.phone_id_for(row);

            let outcome = poll_status(
                self.api,
                phone_id.as_deref(),
                &registration_id,
                self.settings.poll_policy,
                &self.token,
            )
            .await;
            info!(row = line, %registration_id, result = %outcome, "registration checked");
            progress.polled(line, &registration_id, &outcome);

            sheet.row_mut(index).status_detail = outcome.to_string();
            summary.polled += 1;
            self.persist(sheet, line, &mut summary);
            progress.advance();

            if index + 1 < total && !self.token.is_cancelled() {
                interrupt::pause(self.settings.poll_row_delay, &self.token).await;
            }
        }

        progress.finish();
        summary.finish(&self.token)
    }

    fn contact_request(&self, row: &ContactRow) -> ContactRequest {
        ContactRequest {
            name: non_blank(&row.name).unwrap_or_else(|| self.settings.default_name.clone()),
            chat_number: row.chat_number.trim().to_string(),
            phone_id: self.phone_id_for(row),
            dialog_id: non_blank(&row.dialog_id),
            user_id: non_blank(&row.user_id),
        }
    }

    fn phone_id_for(&self, row: &ContactRow) -> Option<String> {
        non_blank(&row.phone_id).or_else(|| non_blank(&self.settings.default_phone_id))
    }

    // A failed save keeps the original file; the change stays in memory and
    // goes out with the next successful save.
    fn persist(&self, sheet: &Sheet, line: usize, summary: &mut RunSummary) {
        if let Err(e) = self.store.save(sheet) {
            error!(row = line, error = %e, "could not save sheet");
            summary.save_failures += 1;
        }
    }
}
