use std::time::Duration;

use crate::connector::scn::Scn;
use crate::connector::{Error, Result};

use super::super::session::{LogFile, MiningSession};

/// Replaces the session's registered file set with the logs needed to mine
/// from `offset_scn`.
///
/// Online logs qualify when their range reaches the offset or they are the
/// current redo (next change equal to the max-SCN sentinel); archived logs
/// within the retention window supplement them. An archived copy of an
/// online log shares its next-change SCN, which is what the de-duplication
/// keys on. An empty plan means the offset is no longer mineable and the
/// only way forward is a fresh snapshot.
pub(crate) fn plan_log_files<S: MiningSession + ?Sized>(
    session: &mut S,
    offset_scn: Scn,
    archive_retention: Duration,
) -> Result<Vec<LogFile>> {
    for name in session.registered_files()? {
        log::debug!("file {name} removed from mining session");
        session.deregister_file(&name)?;
    }

    let max_scn = session.max_scn()?;
    let online = session.list_online_logs()?;
    let archived = session.list_archived_logs(offset_scn, archive_retention)?;

    let mut plan: Vec<LogFile> = online
        .into_iter()
        .filter(|file| {
            let keep = file.next_change >= offset_scn || file.next_change == max_scn;
            if keep {
                log::trace!(
                    "online log {} with range {} to {} to be added",
                    file.name,
                    file.first_change,
                    file.next_change
                );
            } else {
                log::trace!(
                    "online log {} with range {} to {} to be excluded",
                    file.name,
                    file.first_change,
                    file.next_change
                );
            }
            keep
        })
        .collect();
    for file in archived {
        if plan.iter().all(|planned| planned.next_change != file.next_change) {
            plan.push(file);
        }
    }

    if plan.is_empty() {
        return Err(Error::NoLogsContainOffset(offset_scn));
    }

    for file in &plan {
        log::trace!("adding log file {} to mining session", file.name);
        session.register_file(file)?;
    }
    log::debug!(
        "offset SCN {offset_scn}, log file list to mine: {:?}",
        plan.iter().map(|file| file.name.as_str()).collect::<Vec<_>>()
    );
    Ok(plan)
}
