// SipSense - Operator Console
//
// Line-based commands on stdin, forwarded to the sensor task:
//   c / calibrate   re-run calibration (hold the bottle upright and still)
//   r / reset       clear the lifetime water total
//   s / status      report totals
//   q / quit        stop

use std::io::BufRead;
use std::sync::mpsc::Sender;

use crate::events::TrackerCommand;

pub fn console_task<R: BufRead>(input: R, cmd_tx: Sender<TrackerCommand>) {
    log::info!("Console ready: [c]alibrate, [r]eset, [s]tatus, [q]uit");

    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::warn!("Console read error: {}", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match TrackerCommand::parse(&line) {
            Some(cmd) => {
                let quit = cmd == TrackerCommand::Shutdown;
                if cmd_tx.send(cmd).is_err() || quit {
                    return;
                }
            }
            None => log::warn!("Unknown command {:?}", line.trim()),
        }
    }

    log::debug!("Console input closed");
}
