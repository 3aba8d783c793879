//! Parsers for `|`-delimited runtime listings.
//!
//! Each `--format` template and the parser that reads it are kept in step:
//! fields arrive in template order, missing trailing fields read as empty
//! strings and anything past the expected count is ignored.

use super::records::{ContainerRecord, ContainerState, ImageRecord, SystemSnapshot, VolumeRecord};

/// Separator used by every listing template.
pub const FIELD_DELIMITER: char = '|';

/// Mebibytes per gibibyte.
const MIB_PER_GIB: f64 = 1024.0;

/// Splits a line into exactly `N` trimmed fields.
#[must_use]
pub fn split_fields<const N: usize>(line: &str) -> [&str; N] {
    let mut fields = [""; N];
    for (slot, part) in fields.iter_mut().zip(line.split(FIELD_DELIMITER)) {
        *slot = part.trim();
    }
    fields
}

/// Parses every non-blank line of `output` with `parse_line`.
pub fn parse_lines<T>(output: &str, parse_line: fn(&str) -> Option<T>) -> Vec<T> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_line)
        .collect()
}

/// Parses `ID|Names|State|Status|Image`.
#[must_use]
pub fn parse_container_line(line: &str) -> Option<ContainerRecord> {
    let [id, name, state, status, image] = split_fields(line);
    if id.is_empty() {
        return None;
    }

    Some(ContainerRecord {
        id: id.to_string(),
        name: name.to_string(),
        state: ContainerState::parse(state),
        status: status.to_string(),
        image: image.to_string(),
    })
}

/// Parses `ID|Repository|Tag|Size`.
#[must_use]
pub fn parse_image_line(line: &str) -> Option<ImageRecord> {
    let [id, repository, tag, size] = split_fields(line);
    if id.is_empty() {
        return None;
    }

    Some(ImageRecord {
        id: id.to_string(),
        repository: repository.to_string(),
        tag: tag.to_string(),
        size: size.to_string(),
    })
}

/// Parses `Name|Driver`.
#[must_use]
pub fn parse_volume_line(line: &str) -> Option<VolumeRecord> {
    let [name, driver] = split_fields(line);
    if name.is_empty() {
        return None;
    }

    Some(VolumeRecord {
        name: name.to_string(),
        driver: driver.to_string(),
    })
}

/// Reads one identifier per non-blank line.
#[must_use]
pub fn parse_id_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses a CPU field such as `12.5%`. Malformed values count as zero.
#[must_use]
pub fn parse_cpu_percent(field: &str) -> f64 {
    field
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Parses a memory field such as `1.5GiB / 7.7GiB` into MiB.
///
/// Only the usage before `/` is read. Gigabyte units are scaled by 1024,
/// any other unit is taken as MiB. Malformed magnitudes count as zero.
#[must_use]
pub fn parse_memory_mib(field: &str) -> f64 {
    let usage = field.split('/').next().unwrap_or_default().trim();
    let digits_end = usage
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(usage.len());

    let magnitude = usage[..digits_end].parse::<f64>().unwrap_or(0.0);
    let unit = usage[digits_end..].trim();

    if unit.starts_with(['G', 'g']) {
        magnitude * MIB_PER_GIB
    } else {
        magnitude
    }
}

/// Renders a MiB total as `"x.xx GiB"` from 1024 MiB upwards, else `"x.x MiB"`.
#[must_use]
pub fn format_memory(total_mib: f64) -> String {
    if total_mib >= MIB_PER_GIB {
        format!("{:.2} GiB", total_mib / MIB_PER_GIB)
    } else {
        format!("{:.1} MiB", total_mib)
    }
}

/// Aggregates `CPUPerc|MemUsage` lines into one snapshot.
///
/// CPU is summed, not averaged. Every non-blank line counts as a container
/// whether or not its fields parsed.
#[must_use]
pub fn aggregate_stats(output: &str) -> SystemSnapshot {
    let mut cpu_percent = 0.0;
    let mut memory_mib = 0.0;
    let mut container_count = 0;

    for line in output.lines().filter(|line| !line.trim().is_empty()) {
        let [cpu, memory] = split_fields(line);
        cpu_percent += parse_cpu_percent(cpu);
        memory_mib += parse_memory_mib(memory);
        container_count += 1;
    }

    SystemSnapshot {
        cpu_percent,
        memory_usage: format_memory(memory_mib),
        container_count,
    }
}
