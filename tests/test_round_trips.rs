mod fixtures;
use fixtures::*;

use fvalue::{DataHandle, IntegerFormat, Value, ValueType};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn integer_type(bit_width: usize, signed: bool) -> ValueType {
    match (bit_width, signed) {
        (8, true) => ValueType::Integer8,
        (16, true) => ValueType::Integer16,
        (32, true) => ValueType::Integer32,
        (64, true) => ValueType::Integer64,
        (8, false) => ValueType::UnsignedInteger8,
        (16, false) => ValueType::UnsignedInteger16,
        (32, false) => ValueType::UnsignedInteger32,
        _ => ValueType::UnsignedInteger64,
    }
}

fn mask(bit_width: usize) -> u64 {
    if bit_width == 64 {
        u64::MAX
    } else {
        (1 << bit_width) - 1
    }
}

/// Renders `value` with `flags` and parses the rendering back into a fresh value.
fn round_trip(value_type: ValueType, raw: u64, bit_width: usize, flags: u32) -> (String, u64) {
    let bytes = raw.to_le_bytes();
    let mut value = value_with_data(value_type, &bytes[..bit_width / 8], LE);
    value.set_format_flags(flags);
    let text = rendered(&value, 0);

    let mut input = text.clone().into_bytes();
    input.push(0);
    let mut parsed = Value::new(value_type);
    parsed.set_format_flags(flags);
    let mut index = 0;
    assert!(
        parsed
            .copy_from_utf8_string_with_index(0, &input, &mut index)
            .unwrap()
    );
    assert_eq!(index, input.len());

    let (parsed_raw, parsed_width) = parsed.copy_to_integer(0).unwrap().unwrap();
    assert_eq!(parsed_width, bit_width);
    (text, parsed_raw)
}

proptest! {
    #[test]
    fn decimal_strings_parse_back(
        raw in any::<u64>(),
        bit_width in prop::sample::select(vec![8_usize, 16, 32, 64]),
        signed in any::<bool>(),
    ) {
        let raw = raw & mask(bit_width);
        let sign = if signed { IntegerFormat::SIGNED } else { IntegerFormat::UNSIGNED };
        let flags = (IntegerFormat::DECIMAL | sign).bits();

        let (_, parsed) = round_trip(integer_type(bit_width, signed), raw, bit_width, flags);
        prop_assert_eq!(parsed, raw);
    }

    #[test]
    fn hexadecimal_strings_parse_back(
        raw in any::<u64>(),
        bit_width in prop::sample::select(vec![8_usize, 16, 32, 64]),
        base_indicator in any::<bool>(),
    ) {
        let raw = raw & mask(bit_width);
        let mut flags = IntegerFormat::HEXADECIMAL;
        if !base_indicator {
            flags |= IntegerFormat::NO_BASE_INDICATOR;
        }

        let (text, parsed) =
            round_trip(integer_type(bit_width, false), raw, bit_width, flags.bits());
        prop_assert_eq!(parsed, raw);
        prop_assert_eq!(text.len(), bit_width / 4 + if base_indicator { 2 } else { 0 });
    }

    #[test]
    fn utf16_and_utf32_renderings_agree(raw in any::<i32>()) {
        let value = value_with_data(ValueType::Integer32, &raw.to_le_bytes(), LE);
        let expected = raw.to_string();

        let size = value.get_utf16_string_size(0).unwrap().unwrap();
        let mut utf16 = vec![0xffff_u16; size];
        let mut index = 0;
        value.copy_to_utf16_string_with_index(0, &mut utf16, &mut index).unwrap();
        prop_assert_eq!(index, size);
        prop_assert_eq!(String::from_utf16(&utf16[..size - 1]).unwrap(), expected.clone());

        let size = value.get_utf32_string_size(0).unwrap().unwrap();
        prop_assert_eq!(size, expected.len() + 1);
    }

    #[test]
    fn appended_entries_stay_in_bounds(chunks in prop::collection::vec(
        prop::collection::vec(any::<u8>(), 1..16), 1..12)
    ) {
        let mut handle = DataHandle::new();
        let mut expected_size = 0;
        for chunk in &chunks {
            let index = handle.append_value_entry_data(chunk, LE).unwrap();
            expected_size += chunk.len();
            prop_assert_eq!(handle.data_size(), expected_size);
            prop_assert_eq!(handle.value_entry_data(index).unwrap().0, chunk.as_slice());
            for entry in handle.value_entries() {
                prop_assert!(entry.fits(handle.data_size()));
            }
        }
        prop_assert_eq!(handle.number_of_value_entries(), chunks.len());
    }
}

#[test]
fn test_forty_two() {
    ensure_env_logger_initialized();
    let mut value = value_with_data(ValueType::UnsignedInteger32, &42_u32.to_le_bytes(), LE);

    let mut out = [0_u8; 16];
    let mut index = 0;
    assert!(
        value
            .copy_to_utf8_string_with_index(0, &mut out, &mut index)
            .unwrap()
    );
    assert_eq!(index, 3);
    assert_eq!(&out[..3], b"42\0");

    value.set_format_flags((IntegerFormat::HEXADECIMAL | IntegerFormat::NO_BASE_INDICATOR).bits());
    let mut index = 0;
    value
        .copy_to_utf8_string_with_index(0, &mut out, &mut index)
        .unwrap();
    assert_eq!(&out[..index], b"0000002a\0");
}

#[test]
fn test_boolean_sizes() {
    ensure_env_logger_initialized();
    let value = value_with_data(ValueType::Boolean, &[0], LE);
    assert_eq!(value.get_utf8_string_size(0).unwrap(), Some(6));
    assert_eq!(rendered(&value, 0), "false");

    let value = value_with_data(ValueType::Boolean, &[1], LE);
    assert_eq!(value.get_utf8_string_size(0).unwrap(), Some(5));
    assert_eq!(rendered(&value, 0), "true");
}

#[test]
fn test_append_scenario() {
    ensure_env_logger_initialized();
    let mut value = Value::new(ValueType::BinaryData);
    assert_eq!(
        value
            .append_entry_data(b"AA", fvalue::DataEncoding::None)
            .unwrap(),
        0
    );
    assert_eq!(
        value
            .append_entry_data(b"BBB", fvalue::DataEncoding::None)
            .unwrap(),
        1
    );

    assert_eq!(value.data_size(), 5);
    let entries: Vec<_> = value
        .data_handle()
        .value_entries()
        .into_iter()
        .map(|entry| (entry.offset, entry.size))
        .collect();
    assert_eq!(entries, vec![(0, 2), (2, 3)]);
    assert_eq!(rendered(&value, 1), "424242");
}

#[test]
fn test_instance_access_repeats_results() {
    ensure_env_logger_initialized();
    let value = value_with_data(ValueType::Filetime, &FILETIME_2018.to_le_bytes(), LE);
    let first = value.value_instance(0).unwrap().cloned();
    let second = value.value_instance(0).unwrap().cloned();
    assert!(first.is_some());
    assert_eq!(first, second);

    let broken = value_with_data(ValueType::Guid, &GUID_BYTES[..10], LE);
    let first = broken.value_instance(0).unwrap_err();
    let second = broken.value_instance(0).unwrap_err();
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first.domain(), second.domain());
}
