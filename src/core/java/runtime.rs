// ── Java version policy ─────────────────────────────────

/// One row of the game-version → Java policy: releases at or after
/// `since` (major, minor, patch) need `java` or newer on the same track.
struct PolicyRow {
    since: (u32, u32, u32),
    java: u32,
}

/// Newest first. Versions that cannot be parsed use the first row.
const RELEASE_POLICY: &[PolicyRow] = &[
    PolicyRow {
        since: (1, 20, 5),
        java: 21,
    },
    PolicyRow {
        since: (1, 17, 0),
        java: 17,
    },
    PolicyRow {
        since: (0, 0, 0),
        java: 8,
    },
];

/// Weekly snapshots (`24w14a`) map by year.
const SNAPSHOT_JAVA21_FROM_YEAR: u32 = 24;

/// Java major version required by a game version.
pub fn required_java_major(game_version: &str) -> u32 {
    let lower = game_version.trim().to_ascii_lowercase();
    if let Some(year) = snapshot_year(&lower) {
        return if year >= SNAPSHOT_JAVA21_FROM_YEAR { 21 } else { 17 };
    }

    let Some(version) = parse_release(&lower) else {
        return RELEASE_POLICY[0].java;
    };
    RELEASE_POLICY
        .iter()
        .find(|row| version >= row.since)
        .map(|row| row.java)
        .unwrap_or(RELEASE_POLICY[0].java)
}

/// A runtime is acceptable when it is exactly the required major, or newer
/// when the requirement itself is modern. Legacy (Java 8) games break on
/// newer runtimes.
pub fn is_acceptable_major(found: u32, required: u32) -> bool {
    found == required || (required >= 17 && found > required)
}

fn snapshot_year(lower: &str) -> Option<u32> {
    let (year, rest) = lower.split_once('w')?;
    if year.len() != 2 || !rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    year.parse().ok()
}

fn parse_release(lower: &str) -> Option<(u32, u32, u32)> {
    let mut parts = lower.split('.');
    let major = leading_number(parts.next()?)?;
    let minor = leading_number(parts.next()?)?;
    let patch = parts.next().and_then(leading_number).unwrap_or(0);
    Some((major, minor, patch))
}

fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

// ── `java -version` parsing ─────────────────────────────

/// First quoted string in the output, e.g. `openjdk version "17.0.8" 2023-07-18`.
pub fn parse_version_string(output: &str) -> Option<String> {
    for line in output.lines() {
        if let Some(start) = line.find('"') {
            if let Some(end) = line[start + 1..].find('"') {
                return Some(line[start + 1..start + 1 + end].to_string());
            }
        }
    }
    None
}

/// `1.8.0_392` → 8, `17.0.8` → 17, `21-ea` → 21.
pub fn parse_major_version(version: &str) -> Option<u32> {
    let mut parts = version.split('.');
    let first = leading_number(parts.next()?)?;
    if first == 1 {
        parts.next().and_then(leading_number)
    } else {
        Some(first)
    }
}
