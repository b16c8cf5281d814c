//! Calendar helpers: timestamp parsing, partition keys, and time-of-day ordering.

use std::cmp::Ordering;

use time::{
	Date, OffsetDateTime, PrimitiveDateTime, Time, format_description::well_known::Rfc3339,
	macros::format_description,
};

/// Parses the timestamp spellings the backend emits.
///
/// Accepts RFC 3339, bare dates (`YYYY-MM-DD`, midnight UTC), and offset-less date-times separated
/// by `T` or a space (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
	let raw = raw.trim();

	if raw.is_empty() {
		return None;
	}
	if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
		return Some(ts);
	}
	if let Ok(date) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
		return Some(date.midnight().assume_utc());
	}

	let local_formats = [
		format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
		format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
		format_description!("[year]-[month]-[day]T[hour]:[minute]"),
		format_description!("[year]-[month]-[day] [hour]:[minute]"),
	];

	local_formats
		.iter()
		.find_map(|format| PrimitiveDateTime::parse(raw, *format).ok())
		.map(PrimitiveDateTime::assume_utc)
}

/// `YYYY-MM-DD` of the timestamp's own calendar date.
pub fn partition_key(ts: OffsetDateTime) -> String {
	ts.date().to_string()
}

/// Seconds since midnight for `HH:MM`, `HH:MM:SS`, and `H:MM am/pm` inputs.
///
/// As a last resort the input is read as the time part of an RFC 3339 timestamp, which covers
/// offset-qualified spellings such as `09:15:00Z`.
pub fn parse_time_of_day(raw: &str) -> Option<u32> {
	let normalized = raw.trim().to_ascii_lowercase();

	if normalized.is_empty() {
		return None;
	}

	let meridiem = if let Some(rest) = normalized.strip_suffix("am") {
		Some((rest.trim_end(), false))
	} else {
		normalized.strip_suffix("pm").map(|rest| (rest.trim_end(), true))
	};

	if let Some((clock, is_pm)) = meridiem {
		let (hour, minute, second) = split_clock(clock)?;

		if !(1..=12).contains(&hour) {
			return None;
		}

		let hour = hour % 12 + if is_pm { 12 } else { 0 };

		return Some(hour * 3_600 + minute * 60 + second);
	}
	if let Some((hour, minute, second)) = split_clock(&normalized)
		&& hour < 24
	{
		return Some(hour * 3_600 + minute * 60 + second);
	}

	OffsetDateTime::parse(&format!("2000-01-01T{}", raw.trim()), &Rfc3339)
		.ok()
		.map(|ts| seconds_of(ts.time()))
}

/// Ascending time-of-day order with unparseable values last.
pub fn compare_time_of_day(a: Option<&str>, b: Option<&str>) -> Ordering {
	let key = |raw: Option<&str>| match raw.and_then(parse_time_of_day) {
		Some(seconds) => (0, seconds),
		None => (1, 0),
	};

	key(a).cmp(&key(b))
}

fn split_clock(clock: &str) -> Option<(u32, u32, u32)> {
	let mut parts = clock.split(':');
	let hour = parse_component(parts.next()?, 2)?;
	let minute = parse_component(parts.next()?, 2)?;
	let second = match parts.next() {
		Some(raw) => parse_component(raw, 2)?,
		None => 0,
	};

	if parts.next().is_some() || minute >= 60 || second >= 60 {
		return None;
	}

	Some((hour, minute, second))
}

fn parse_component(raw: &str, max_len: usize) -> Option<u32> {
	if raw.is_empty() || raw.len() > max_len || !raw.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}

	raw.parse().ok()
}

fn seconds_of(time: Time) -> u32 {
	u32::from(time.hour()) * 3_600 + u32::from(time.minute()) * 60 + u32::from(time.second())
}
