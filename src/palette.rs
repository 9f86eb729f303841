use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

/// Folder colors, in display order.
pub const FOLDER_PALETTE: [&str; 18] = [
    "#f44336", "#e91e63", "#9c27b0", "#673ab7", "#3f51b5", "#2196f3",
    "#03a9f4", "#00bcd4", "#009688", "#4caf50", "#8bc34a", "#cddc39",
    "#ffeb3b", "#ffc107", "#ff9800", "#ff5722", "#795548", "#607d8b",
];

/// Uniform pick among palette colors not in `in_use`. Once every color is
/// taken, uniform pick over the whole palette.
pub fn pick_folder_color<'a, R: Rng + ?Sized>(
    in_use: impl IntoIterator<Item = &'a str>,
    rng: &mut R,
) -> &'static str {
    let used: HashSet<String> = in_use.into_iter().map(|c| c.to_ascii_lowercase()).collect();
    let free: Vec<&'static str> = FOLDER_PALETTE
        .iter()
        .copied()
        .filter(|c| !used.contains(*c))
        .collect();
    let pool: &[&'static str] = if free.is_empty() { &FOLDER_PALETTE } else { &free };
    pool.choose(rng).copied().unwrap_or(FOLDER_PALETTE[0])
}
