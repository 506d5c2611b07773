//! Flattening of library records into relational rows.
//!
//! Turns the symbol → unit → pin → alternate hierarchy into one
//! [`SymbolRow`] plus a flat list of [`PinRow`]s, and a footprint into a
//! [`FootprintRow`] with a derived pad count. Everything here is pure; row
//! ids are assigned later by the storage backend.

use std::path::Path;

use tracing::debug;

use crate::validate::{MappingError, MappingRules, validate_footprint, validate_symbol};
use crate::{FlatSymbol, FootprintRecord, FootprintRow, PadRecord, PinRecord, PinRow, SymbolRecord, SymbolRow};

/// Derives a library name from the path of a library file or directory.
///
/// Takes the final path segment and strips everything from its last `.`.
/// The name is never read from inside the file.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use kicad_libdb_core::library_name_from_path;
///
/// assert_eq!(library_name_from_path(Path::new("/libs/Resistors.kicad_sym")), "Resistors");
/// assert_eq!(library_name_from_path(Path::new("fp/LED_SMD.pretty")), "LED_SMD");
/// assert_eq!(library_name_from_path(Path::new("Connector.Generic.kicad_sym")), "Connector.Generic");
/// assert_eq!(library_name_from_path(Path::new("plain")), "plain");
/// ```
pub fn library_name_from_path(path: &Path) -> String {
    let segment = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match segment.rsplit_once('.') {
        Some((stem, _extension)) => stem.to_string(),
        None => segment,
    }
}

/// Collects every pin of a symbol, including the pins of all nested units.
///
/// Traversal is pre-order with an explicit stack: the symbol's own pins
/// first, then each unit in declared order, each unit fully before the
/// next. Pins are not deduplicated.
pub fn collect_pins(symbol: &SymbolRecord) -> Vec<&PinRecord> {
    let mut pins = Vec::new();
    let mut pending = vec![symbol];

    while let Some(current) = pending.pop() {
        pins.extend(current.pins.iter());
        pending.extend(current.units.iter().rev());
    }

    pins
}

/// Expands the alternates of a pin into pin rows.
///
/// Each row carries the alternate's own name and electrical type and the
/// base pin's number.
///
/// # Examples
///
/// ```
/// use kicad_libdb_core::{PinRecord, expand_alternates};
///
/// let pin = PinRecord::new("7", "PA0", "bidirectional")
///     .with_alternate("ADC_IN0", "input")
///     .with_alternate("TIM2_CH1", "output");
/// let rows = expand_alternates(&pin);
/// assert_eq!(rows.len(), 2);
/// assert!(rows.iter().all(|r| r.number == "7" && r.is_alternate));
/// assert_eq!(rows[1].name, "TIM2_CH1");
/// ```
pub fn expand_alternates(pin: &PinRecord) -> Vec<PinRow> {
    pin.alternates
        .iter()
        .map(|alt| PinRow {
            number: pin.number.clone(),
            name: alt.name.clone(),
            electrical_type: alt.electrical_type.clone(),
            is_alternate: true,
        })
        .collect()
}

fn base_pin_row(pin: &PinRecord) -> PinRow {
    PinRow {
        number: pin.number.clone(),
        name: pin.name.clone(),
        electrical_type: pin.electrical_type.clone(),
        is_alternate: false,
    }
}

/// Builds all pin rows of a symbol: every base pin, then every alternate.
pub fn pin_rows(symbol: &SymbolRecord) -> Vec<PinRow> {
    let pins = collect_pins(symbol);
    let mut rows: Vec<PinRow> = pins.iter().map(|pin| base_pin_row(pin)).collect();
    rows.extend(pins.iter().flat_map(|pin| expand_alternates(pin)));
    rows
}

/// Flattens one symbol into its parent row and pin rows.
///
/// # Errors
///
/// Returns the first [`MappingError`] reported by
/// [`validate_symbol`](crate::validate_symbol).
pub fn flatten_symbol(
    symbol: &SymbolRecord,
    library: &str,
    rules: &MappingRules,
) -> Result<FlatSymbol, MappingError> {
    if let Some(err) = validate_symbol(symbol, rules).into_iter().next() {
        return Err(err);
    }

    let pins = pin_rows(symbol);
    debug!(symbol = %symbol.name, library, pins = pins.len(), "Flattened symbol");

    Ok(FlatSymbol {
        symbol: SymbolRow {
            name: symbol.name.clone(),
            library: library.to_string(),
            properties: symbol.properties.clone(),
        },
        pins,
    })
}

/// Counts pads whose label is a positive integer or a non-blank string.
pub fn count_numbered_pads(pads: &[PadRecord]) -> usize {
    pads.iter().filter(|pad| pad.number.is_numbered()).count()
}

/// Flattens one footprint into its row, deriving the pad count.
///
/// # Errors
///
/// Returns [`MappingError::EmptyName`] for an unnamed footprint.
pub fn flatten_footprint(
    footprint: &FootprintRecord,
    library: &str,
) -> Result<FootprintRow, MappingError> {
    if let Some(err) = validate_footprint(footprint).into_iter().next() {
        return Err(err);
    }

    Ok(FootprintRow {
        name: footprint.name.clone(),
        library: library.to_string(),
        description: footprint.description.clone(),
        tags: footprint.tags.clone(),
        pads: count_numbered_pads(&footprint.pads),
        properties: footprint.properties.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PadNumber, PadRecord};

    fn sorted(mut rows: Vec<PinRow>) -> Vec<PinRow> {
        rows.sort();
        rows
    }

    fn nested_symbol(depth: usize) -> SymbolRecord {
        let mut unit = SymbolRecord::new(&format!("U_{depth}"))
            .with_pin(PinRecord::new(&depth.to_string(), "deep", "passive"));
        for level in (0..depth).rev() {
            unit = SymbolRecord::new(&format!("U_{level}"))
                .with_pin(PinRecord::new(&level.to_string(), "mid", "passive"))
                .with_unit(unit);
        }
        unit
    }

    #[test]
    fn test_library_name_ignores_directories() {
        assert_eq!(
            library_name_from_path(Path::new("some.dir/with.dots/Device.kicad_sym")),
            "Device"
        );
    }

    #[test]
    fn test_library_name_hidden_file() {
        assert_eq!(library_name_from_path(Path::new("libs/.kicad_sym")), "");
    }

    #[test]
    fn test_collect_pins_counts_own_and_nested() {
        let symbol = SymbolRecord::new("IC")
            .with_pin(PinRecord::new("1", "A", "input"))
            .with_pin(PinRecord::new("2", "B", "input"))
            .with_unit(
                SymbolRecord::new("IC_1_1")
                    .with_pin(PinRecord::new("3", "C", "output"))
                    .with_unit(SymbolRecord::new("IC_1_2").with_pin(PinRecord::new("4", "D", "output"))),
            )
            .with_unit(SymbolRecord::new("IC_2_1").with_pin(PinRecord::new("5", "E", "power_in")));

        let mut numbers: Vec<&str> = collect_pins(&symbol).iter().map(|p| p.number.as_str()).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_collect_pins_traversal_order() {
        let symbol = SymbolRecord::new("S")
            .with_pin(PinRecord::new("own", "", "passive"))
            .with_unit(
                SymbolRecord::new("first")
                    .with_pin(PinRecord::new("first", "", "passive"))
                    .with_unit(SymbolRecord::new("inner").with_pin(PinRecord::new("inner", "", "passive"))),
            )
            .with_unit(SymbolRecord::new("second").with_pin(PinRecord::new("second", "", "passive")));

        let order: Vec<&str> = collect_pins(&symbol).iter().map(|p| p.number.as_str()).collect();
        assert_eq!(order, vec!["own", "first", "inner", "second"]);
    }

    #[test]
    fn test_collect_pins_keeps_duplicates() {
        let shared = PinRecord::new("7", "GND", "power_in");
        let symbol = SymbolRecord::new("Dual")
            .with_unit(SymbolRecord::new("Dual_1_1").with_pin(shared.clone()))
            .with_unit(SymbolRecord::new("Dual_2_1").with_pin(shared));
        assert_eq!(collect_pins(&symbol).len(), 2);
    }

    #[test]
    fn test_collect_pins_deep_nesting() {
        let symbol = nested_symbol(500);
        assert_eq!(collect_pins(&symbol).len(), 501);
    }

    #[test]
    fn test_collect_pins_empty_symbol() {
        assert!(collect_pins(&SymbolRecord::new("empty")).is_empty());
    }

    #[test]
    fn test_expand_alternates_none() {
        assert!(expand_alternates(&PinRecord::new("1", "A", "passive")).is_empty());
    }

    #[test]
    fn test_pin_rows_base_then_alternates() {
        let symbol = SymbolRecord::new("MCU")
            .with_pin(PinRecord::new("1", "PA0", "bidirectional").with_alternate("ADC0", "input"))
            .with_pin(PinRecord::new("2", "PA1", "bidirectional"));
        let rows = pin_rows(&symbol);
        assert_eq!(rows.len(), 3);
        assert!(!rows[0].is_alternate);
        assert!(!rows[1].is_alternate);
        assert_eq!(
            rows[2],
            PinRow {
                number: "1".into(),
                name: "ADC0".into(),
                electrical_type: "input".into(),
                is_alternate: true,
            }
        );
    }

    #[test]
    fn test_flatten_symbol_led_rgb() {
        let symbol = SymbolRecord::new("LED_RGB")
            .with_property("Reference", "D")
            .with_property("Footprint", "LED:LED_0603")
            .with_unit(
                SymbolRecord::new("LED_RGB_1_1")
                    .with_pin(PinRecord::new("1", "R", "passive").with_alternate("A", "passive"))
                    .with_pin(PinRecord::new("2", "G", "passive"))
                    .with_pin(PinRecord::new("3", "B", "passive"))
                    .with_pin(PinRecord::new("4", "GND", "passive")),
            );

        let flat = flatten_symbol(&symbol, "LED", &MappingRules::requiring(&["Reference"])).unwrap();
        assert_eq!(flat.symbol.name, "LED_RGB");
        assert_eq!(flat.symbol.library, "LED");
        assert_eq!(flat.symbol.property("Footprint"), Some("LED:LED_0603"));

        let base: Vec<_> = flat.pins.iter().filter(|p| !p.is_alternate).collect();
        let alternates: Vec<_> = flat.pins.iter().filter(|p| p.is_alternate).collect();
        assert_eq!(base.len(), 4);
        assert_eq!(alternates.len(), 1);
        assert_eq!(alternates[0].number, "1");
        assert_eq!(alternates[0].name, "A");
    }

    #[test]
    fn test_flatten_symbol_multiset_matches_hierarchy() {
        let symbol = SymbolRecord::new("X")
            .with_pin(PinRecord::new("1", "a", "input"))
            .with_unit(SymbolRecord::new("X_1_1").with_pin(PinRecord::new("2", "b", "output")));
        let flat = flatten_symbol(&symbol, "Lib", &MappingRules::default()).unwrap();
        let expected = vec![
            PinRow {
                number: "1".into(),
                name: "a".into(),
                electrical_type: "input".into(),
                is_alternate: false,
            },
            PinRow {
                number: "2".into(),
                name: "b".into(),
                electrical_type: "output".into(),
                is_alternate: false,
            },
        ];
        assert_eq!(sorted(flat.pins), sorted(expected));
    }

    #[test]
    fn test_flatten_symbol_missing_required_property() {
        let err = flatten_symbol(&SymbolRecord::new("Bad"), "Lib", &MappingRules::requiring(&["Reference"]))
            .unwrap_err();
        assert!(matches!(err, MappingError::MissingProperty { ref key, .. } if key == "Reference"));
    }

    #[test]
    fn test_flatten_footprint_pad_count() {
        let footprint = FootprintRecord::new("SOT-23-3_Mount")
            .with_pad(PadRecord::new(PadNumber::Text("1".into()), "smd"))
            .with_pad(PadRecord::new(PadNumber::Integer(2), "smd"))
            .with_pad(PadRecord::new(PadNumber::Text("EP".into()), "smd"))
            .with_pad(PadRecord::new(PadNumber::Text("".into()), "np_thru_hole"))
            .with_pad(PadRecord::new(PadNumber::Text(" ".into()), "np_thru_hole"));
        let row = flatten_footprint(&footprint, "Package_TO_SOT_SMD").unwrap();
        assert_eq!(row.pads, 3);
        assert_eq!(row.library, "Package_TO_SOT_SMD");
    }

    #[test]
    fn test_flatten_footprint_zero_pads() {
        let footprint = FootprintRecord::new("MountingHole")
            .with_pad(PadRecord::new(PadNumber::Text("".into()), "np_thru_hole"));
        assert_eq!(flatten_footprint(&footprint, "MountingHole").unwrap().pads, 0);
        assert_eq!(flatten_footprint(&FootprintRecord::new("Logo"), "Symbol").unwrap().pads, 0);
    }

    #[test]
    fn test_flatten_footprint_keeps_properties() {
        let footprint = FootprintRecord::new("R_0603").with_property("Reference", "REF**");
        let row = flatten_footprint(&footprint, "Resistor_SMD").unwrap();
        assert_eq!(row.property("Reference"), Some("REF**"));
    }
}
