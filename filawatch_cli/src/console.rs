//! Stdin console: parses operator commands and bridges them to reactor
//! events, printing each reply. Runs on its own thread; the reactor stays the
//! only place core state is touched.

use crossbeam_channel::{Sender, bounded};
use filawatch_core::command::{self, OperatorCommand};
use filawatch_core::reactor::{Command, Event};
use std::io::BufRead;
use std::time::Duration;

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

pub fn spawn(tx: Sender<Event>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match command::parse(&line) {
                Ok(None) => {}
                Ok(Some(OperatorCommand::Quit)) => {
                    let _ = tx.send(Event::Shutdown);
                    break;
                }
                Ok(Some(cmd)) => {
                    let (reply_tx, reply_rx) = bounded(1);
                    let event = match cmd {
                        OperatorCommand::QueryFilamentMotion => {
                            Event::Command(Command::QueryStats { reply: reply_tx })
                        }
                        OperatorCommand::ResetFilamentMotionStats => {
                            Event::Command(Command::ResetStats { reply: reply_tx })
                        }
                        OperatorCommand::SetFilamentMotionDetectLength(value) => {
                            Event::Command(Command::SetDetectionLength {
                                value,
                                reply: reply_tx,
                            })
                        }
                        OperatorCommand::Status => {
                            Event::Command(Command::QueryStatus { reply: reply_tx })
                        }
                        OperatorCommand::Quit => continue,
                    };
                    if tx.send(event).is_err() {
                        break;
                    }
                    match reply_rx.recv_timeout(REPLY_TIMEOUT) {
                        Ok(msg) => println!("{msg}"),
                        Err(_) => println!("!! no response (monitor shutting down?)"),
                    }
                }
                Err(e) => println!("!! {e}"),
            }
        }
        tracing::debug!("console thread exiting");
    });
}
