use super::schedule::{MessageKind, Schedule};
use super::{MidiSink, messages};
use crate::error::PlayerError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep; keeps stop requests responsive across
/// long inter-event gaps.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// How long `stop` waits for the worker before detaching it.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Owns at most one active playback session at a time.
///
/// `play` walks the compiled bytes on a dedicated worker thread, pacing
/// each message by its delta converted to wall time at the current tempo.
/// The worker observes a stop flag between every event and always sends
/// an all-notes-off/all-sound-off sweep on every channel before it exits,
/// whatever the exit path. Dropping the player stops it.
pub struct Player {
    session: Option<Session>,
}

struct Session {
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<(), PlayerError>>>,
}

impl Player {
    pub fn new() -> Self {
        Self { session: None }
    }

    /// Start playing compiled MIDI bytes on the given sink. Any playback
    /// already in progress is fully stopped first.
    pub fn play<S: MidiSink + 'static>(
        &mut self,
        sink: S,
        midi_bytes: &[u8],
    ) -> Result<(), PlayerError> {
        self.stop();

        let schedule = Schedule::parse(midi_bytes)?;
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop_flag);
        let worker = thread::spawn(move || run_session(sink, schedule, &flag));

        self.session = Some(Session {
            stop_flag,
            worker: Some(worker),
        });
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.session
            .as_ref()
            .and_then(|s| s.worker.as_ref())
            .is_some_and(|w| !w.is_finished())
    }

    /// Signal the worker to stop and wait for it to quiesce, bounded by
    /// [`STOP_JOIN_TIMEOUT`]. A worker stuck in a blocking sink call is
    /// detached; the flag stays set, so it silences and exits as soon as
    /// that call returns.
    pub fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.stop_flag.store(true, Ordering::Relaxed);

        let Some(worker) = session.worker.take() else {
            return;
        };
        let deadline = Instant::now() + STOP_JOIN_TIMEOUT;
        while !worker.is_finished() {
            if Instant::now() >= deadline {
                return;
            }
            thread::sleep(SLEEP_SLICE);
        }
        let _ = worker.join();
    }

    /// Block until the current playback finishes on its own, returning
    /// the worker's result. No-op when nothing is playing.
    pub fn wait(&mut self) -> Result<(), PlayerError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        match session.worker.take() {
            Some(worker) => worker
                .join()
                .unwrap_or_else(|_| Err(PlayerError::Send("playback worker panicked".to_string()))),
            None => Ok(()),
        }
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker body: pace the schedule, then silence every channel exactly
/// once on the way out, whether the run ended naturally, was stopped, or
/// failed mid-send.
fn run_session<S: MidiSink>(
    mut sink: S,
    schedule: Schedule,
    stop: &AtomicBool,
) -> Result<(), PlayerError> {
    let result = pace_messages(&mut sink, &schedule, stop);
    if let Err(e) = &result {
        eprintln!("playback error: {e}");
    }
    let silenced = silence_all_channels(&mut sink);
    result.and(silenced)
}

fn pace_messages<S: MidiSink>(
    sink: &mut S,
    schedule: &Schedule,
    stop: &AtomicBool,
) -> Result<(), PlayerError> {
    // 120 BPM until the stream says otherwise.
    let mut us_per_quarter: u64 = 500_000;
    let mut last_tick: u64 = 0;

    for message in &schedule.messages {
        let delta = message.tick - last_tick;
        last_tick = message.tick;

        let wait = Duration::from_micros(delta * us_per_quarter / schedule.ticks_per_quarter as u64);
        if !sleep_unless_stopped(wait, stop) {
            return Ok(());
        }

        match &message.kind {
            MessageKind::Tempo(us) => us_per_quarter = *us as u64,
            MessageKind::Channel(bytes) => sink.send(bytes)?,
        }
    }

    Ok(())
}

/// Sleep for `total`, sliced so the stop flag is observed promptly.
/// Returns false when stop was requested.
fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

/// One all-notes-off plus all-sound-off pair per MIDI channel. Attempts
/// every channel even if a send fails, then reports the first failure.
fn silence_all_channels<S: MidiSink>(sink: &mut S) -> Result<(), PlayerError> {
    let mut first_error = None;
    for channel in 0..16u8 {
        for controller in [messages::ALL_NOTES_OFF, messages::ALL_SOUND_OFF] {
            let message = [messages::CONTROL_CHANGE | channel, controller, 0];
            if let Err(e) = sink.send(&message) {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_single_track;
    use std::sync::Mutex;

    /// Captures every message sent to it.
    #[derive(Clone)]
    struct CapturingSink {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl CapturingSink {
        fn new() -> Self {
            Self {
                sent: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn messages(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl MidiSink for CapturingSink {
        fn send(&mut self, message: &[u8]) -> Result<(), PlayerError> {
            self.sent.lock().unwrap().push(message.to_vec());
            Ok(())
        }
    }

    /// Fails every send after the first `ok_sends`, recording each
    /// attempt either way.
    struct FailingSink {
        ok_sends: usize,
        attempts: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl MidiSink for FailingSink {
        fn send(&mut self, message: &[u8]) -> Result<(), PlayerError> {
            self.attempts.lock().unwrap().push(message.to_vec());
            if self.ok_sends == 0 {
                return Err(PlayerError::Send("device unplugged".to_string()));
            }
            self.ok_sends -= 1;
            Ok(())
        }
    }

    fn count_controller(messages: &[Vec<u8>], controller: u8) -> usize {
        messages
            .iter()
            .filter(|m| m.len() == 3 && m[0] & 0xF0 == 0xB0 && m[1] == controller)
            .count()
    }

    #[test]
    fn test_plays_to_completion_and_silences_once() {
        // T600: 100ms per quarter, so the whole run is well under a second.
        let bytes = compile_single_track("T600C16D16", 480).unwrap();
        let sink = CapturingSink::new();

        let mut player = Player::new();
        player.play(sink.clone(), &bytes).unwrap();
        player.wait().unwrap();

        let sent = sink.messages();

        // Both notes sounded, in order.
        let note_ons: Vec<&Vec<u8>> = sent.iter().filter(|m| m[0] == 0x90).collect();
        assert_eq!(note_ons.len(), 2);
        assert_eq!(note_ons[0][1], 60);
        assert_eq!(note_ons[1][1], 62);

        // Exactly one silence pair per channel, after the voice messages.
        assert_eq!(count_controller(&sent, 123), 16);
        assert_eq!(count_controller(&sent, 120), 16);
        assert_eq!(sent.len(), 4 + 32);
        assert!(sent[sent.len() - 32..].iter().all(|m| m[0] & 0xF0 == 0xB0));
    }

    #[test]
    fn test_stop_sends_no_further_note_on() {
        // One quick note, then a rest of several seconds, then a note
        // that must never sound once stop is requested.
        let bytes = compile_single_track("C16R1R1R1R1C4", 480).unwrap();
        let sink = CapturingSink::new();

        let mut player = Player::new();
        player.play(sink.clone(), &bytes).unwrap();
        thread::sleep(Duration::from_millis(300));
        player.stop();
        assert!(!player.is_playing());

        let sent = sink.messages();
        let note_ons: Vec<&Vec<u8>> = sent.iter().filter(|m| m[0] == 0x90).collect();
        assert_eq!(note_ons.len(), 1);

        // The silence sweep still ran exactly once.
        assert_eq!(count_controller(&sent, 123), 16);
        assert_eq!(count_controller(&sent, 120), 16);
    }

    #[test]
    fn test_stop_without_playback_is_harmless() {
        let mut player = Player::new();
        player.stop();
        player.stop();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_new_playback_stops_previous_session() {
        let long = compile_single_track("C16R1R1R1R1C4", 480).unwrap();
        let short = compile_single_track("T600E16", 480).unwrap();

        let first = CapturingSink::new();
        let second = CapturingSink::new();

        let mut player = Player::new();
        player.play(first.clone(), &long).unwrap();
        thread::sleep(Duration::from_millis(100));
        player.play(second.clone(), &short).unwrap();
        player.wait().unwrap();

        // The first session was silenced and sent nothing afterwards.
        let first_sent = first.messages();
        assert_eq!(count_controller(&first_sent, 123), 16);
        assert_eq!(
            first_sent.iter().filter(|m| m[0] == 0x90).count(),
            1,
            "first session must not reach its second note"
        );

        // The second session ran to completion on its own sink.
        let second_sent = second.messages();
        assert!(second_sent.iter().any(|m| m[0] == 0x90 && m[1] == 64));
    }

    #[test]
    fn test_send_failure_still_attempts_cleanup() {
        let bytes = compile_single_track("T600C16D16", 480).unwrap();
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let sink = FailingSink {
            ok_sends: 1,
            attempts: Arc::clone(&attempts),
        };

        let mut player = Player::new();
        player.play(sink, &bytes).unwrap();
        let result = player.wait();
        assert!(matches!(result, Err(PlayerError::Send(_))));

        // The note-on went through, its note-off failed, and the silence
        // sweep was still attempted on every channel afterwards.
        let attempted = attempts.lock().unwrap().clone();
        assert_eq!(attempted.len(), 2 + 32);
        assert_eq!(attempted[0][0], 0x90);
        assert_eq!(attempted[1][0], 0x80);
        assert_eq!(count_controller(&attempted[2..], 123), 16);
        assert_eq!(count_controller(&attempted[2..], 120), 16);
    }

    #[test]
    fn test_drop_stops_playback() {
        let bytes = compile_single_track("C16R1R1R1R1C4", 480).unwrap();
        let sink = CapturingSink::new();

        {
            let mut player = Player::new();
            player.play(sink.clone(), &bytes).unwrap();
            thread::sleep(Duration::from_millis(100));
        }

        let sent = sink.messages();
        assert_eq!(count_controller(&sent, 123), 16);
        assert_eq!(sent.iter().filter(|m| m[0] == 0x90).count(), 1);
    }
}
