use habitflow_core::DayViewService;

use super::{print_json, CliResult, Session};

pub async fn run(date: Option<&str>, tz: Option<&str>) -> CliResult {
    let session = Session::open(tz)?;
    let day_key = session.day_or_today(date)?;

    let view = DayViewService::new(session.repos())
        .with_legacy_fallback(session.include_legacy_fallback())
        .compute_day_view(session.user_id(), day_key, session.tz)
        .await?;
    print_json(&view)
}
