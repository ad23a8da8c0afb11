const NANOS_PER_MILLI: u64 = 1_000_000;

/// Formats nanoseconds as `HH:MM:SS.mmm`, widening the hours past 99.
pub fn ns_str(ns: u64) -> String {
    let ms = ns / NANOS_PER_MILLI;
    let hours = ms / 3_600_000;
    let minutes = ms / 60_000 % 60;
    let seconds = ms / 1000 % 60;
    let milliseconds = ms % 1000;

    format!("{hours:02}:{minutes:02}:{seconds:02}.{milliseconds:03}")
}

pub fn time_str(sec: f64) -> String {
    ns_str((sec.max(0.0) * 1e9) as u64)
}

#[test]
fn formats_hours_minutes_seconds() {
    assert_eq!(ns_str(0), "00:00:00.000");
    assert_eq!(ns_str(23_219_955), "00:00:00.023");
    assert_eq!(ns_str(3_723_456_000_000), "01:02:03.456");
    assert_eq!(time_str(360_000.0), "100:00:00.000");
}
