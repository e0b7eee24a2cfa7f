use std::collections::BTreeSet;

use regex::Regex;

/// Wafer sizes the catalog records carry; anything else in the input is noise.
pub const VALID_WAFER_SIZES: [&str; 6] =
	["2 inch", "3 inch", "4 inch", "6 inch", "8 inch", "12 inch"];

const MM_TO_INCH: [(&str, &str); 6] = [
	("50", "2 inch"),
	("75", "3 inch"),
	("100", "4 inch"),
	("150", "6 inch"),
	("200", "8 inch"),
	("300", "12 inch"),
];

/// Implied minimum when the input only says 고온 (high temperature).
pub const HIGH_TEMP_THRESHOLD: f32 = 500.0;
/// Implied maximum when the input only says 저온 (low temperature).
pub const LOW_TEMP_THRESHOLD: f32 = 200.0;

const MATERIAL_ALIASES: [(&str, &str); 21] = [
	("si", "Si"),
	("silicon", "Si"),
	("실리콘", "Si"),
	("gan", "GaN"),
	("질화갈륨", "GaN"),
	("gaas", "GaAs"),
	("갈륨비소", "GaAs"),
	("sic", "SiC"),
	("sapphire", "Sapphire"),
	("사파이어", "Sapphire"),
	("algan", "AlGaN"),
	("ingan", "InGaN"),
	("sio2", "SiO2"),
	("sinx", "SiNx"),
	("al", "Al"),
	("aluminum", "Al"),
	("알루미늄", "Al"),
	("quartz", "Quartz"),
	("석영", "Quartz"),
	("glass", "Glass"),
	("유리", "Glass"),
];

const CATEGORY_ALIASES: [(&str, &str); 16] = [
	("mocvd", "MOCVD"),
	("mbe", "MBE"),
	("rta", "RTA"),
	("rtp", "RTP"),
	("pecvd", "PECVD"),
	("lpcvd", "LPCVD"),
	("ald", "ALD"),
	("cmp", "CMP"),
	("sem", "SEM"),
	("tem", "TEM"),
	("rie", "RIE"),
	("sputter", "SPUTTER"),
	("스퍼터", "SPUTTER"),
	("확산로", "FURNACE"),
	("furnace", "FURNACE"),
	("evaporator", "EVAPORATOR"),
];

/// Whole-token containment for ASCII needles: the match may not touch an
/// adjacent ASCII alphanumeric, so "rta" does not fire inside "start".
/// Non-ASCII neighbours (Korean particles glued to an acronym) count as
/// boundaries.
pub fn contains_word(haystack_lower: &str, needle_lower: &str) -> bool {
	if needle_lower.is_empty() {
		return false;
	}

	let mut search_from = 0;

	while let Some(offset) = haystack_lower[search_from..].find(needle_lower) {
		let start = search_from + offset;
		let end = start + needle_lower.len();
		let before_ok = haystack_lower[..start]
			.chars()
			.next_back()
			.map(|ch| !ch.is_ascii_alphanumeric())
			.unwrap_or(true);
		let after_ok = haystack_lower[end..]
			.chars()
			.next()
			.map(|ch| !ch.is_ascii_alphanumeric())
			.unwrap_or(true);

		if before_ok && after_ok {
			return true;
		}

		search_from = end;
	}

	false
}

pub fn extract_wafer_sizes(text: &str) -> BTreeSet<String> {
	let mut sizes = BTreeSet::new();
	let text_lower = text.to_lowercase();

	if let Ok(re) = Regex::new(r#"(\d+)\s*(?:인치|inch|")"#) {
		for capture in re.captures_iter(&text_lower) {
			let size = format!("{} inch", &capture[1]);

			if VALID_WAFER_SIZES.contains(&size.as_str()) {
				sizes.insert(size);
			}
		}
	}

	for (mm, inch) in MM_TO_INCH {
		let pattern = format!(r"\b{mm}\s*mm");

		if Regex::new(&pattern).map(|re| re.is_match(&text_lower)).unwrap_or(false) {
			sizes.insert(inch.to_string());
		}
	}

	sizes
}

pub fn extract_temperature(text: &str) -> (Option<f32>, Option<f32>) {
	// Explicit range first; it subsumes the one-sided patterns.
	if let Ok(re) = Regex::new(r"(\d+)\s*[~～-]\s*(\d+)\s*(?:도|℃|°C|°)")
		&& let Some(capture) = re.captures(text)
	{
		let low = capture[1].parse().ok();
		let high = capture[2].parse().ok();

		return (low, high);
	}

	let mut temp_min = None;
	let mut temp_max = None;

	if let Ok(re) = Regex::new(r"(\d+)\s*(?:도|℃|°C|°)\s*(?:이상|초과)")
		&& let Some(capture) = re.captures(text)
	{
		temp_min = capture[1].parse().ok();
	}
	if let Ok(re) = Regex::new(r"(\d+)\s*(?:도|℃|°C|°)\s*(?:이하|미만|까지)")
		&& let Some(capture) = re.captures(text)
	{
		temp_max = capture[1].parse().ok();
	}
	if temp_max.is_none()
		&& let Ok(re) = Regex::new(r"[~～]\s*(\d+)\s*(?:도|℃|°C|°)")
		&& let Some(capture) = re.captures(text)
	{
		temp_max = capture[1].parse().ok();
	}

	if temp_min.is_none() && text.contains("고온") {
		temp_min = Some(HIGH_TEMP_THRESHOLD);
	}
	if temp_max.is_none() && text.contains("저온") {
		temp_max = Some(LOW_TEMP_THRESHOLD);
	}

	(temp_min, temp_max)
}

pub fn extract_materials(text: &str) -> BTreeSet<String> {
	let mut materials = BTreeSet::new();
	let text_lower = text.to_lowercase();

	for (alias, normalized) in MATERIAL_ALIASES {
		let matched = if alias.is_ascii() {
			contains_word(&text_lower, alias)
		} else {
			text_lower.contains(alias)
		};

		if matched {
			materials.insert(normalized.to_string());
		}
	}

	materials
}

/// Literal process tokens the user named directly. Category inference from
/// process phrases ("에피 성장") is owned by the policy mapping table.
pub fn extract_category_hints(text: &str) -> BTreeSet<String> {
	let mut hints = BTreeSet::new();
	let text_lower = text.to_lowercase();

	for (alias, category) in CATEGORY_ALIASES {
		let matched = if alias.is_ascii() {
			contains_word(&text_lower, alias)
		} else {
			text_lower.contains(alias)
		};

		if matched {
			hints.insert(category.to_string());
		}
	}

	hints
}
