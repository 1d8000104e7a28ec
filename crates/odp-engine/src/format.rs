//! String and number formatting shared by column and property transforms.

/// Left-pad with zeros to `width` characters, keeping a leading sign in front.
/// Strings already at least `width` long are returned unchanged.
pub fn zero_pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len >= width {
        return value.to_string();
    }

    let fill = "0".repeat(width - len);
    match value.chars().next() {
        Some(sign @ ('+' | '-')) => format!("{}{}{}", sign, fill, &value[sign.len_utf8()..]),
        _ => format!("{}{}", fill, value),
    }
}

/// Remove every leading character contained in `chars`
pub fn left_strip<'a>(value: &'a str, chars: &str) -> &'a str {
    value.trim_start_matches(|c: char| chars.contains(c))
}

/// Character slice `value[start:stop]` with negative indices counting from the end
pub fn slice_chars(value: &str, start: Option<i64>, stop: Option<i64>) -> String {
    let len = value.chars().count() as i64;
    let clamp = |index: i64| {
        if index < 0 {
            (index + len).max(0)
        } else {
            index.min(len)
        }
    };

    let from = start.map_or(0, clamp);
    let to = stop.map_or(len, clamp);
    if from >= to {
        return String::new();
    }

    value.chars().skip(from as usize).take((to - from) as usize).collect()
}

/// Keep the last `count` characters
pub fn last_chars(value: &str, count: usize) -> String {
    let len = value.chars().count();
    value.chars().skip(len.saturating_sub(count)).collect()
}

/// Normalize a Berlin phone number to `+4930<local>`.
///
/// Separators and bidi embedding marks are dropped, as is any leading area
/// code written as `030` or `(030)`. Nothing left gives an empty string.
pub fn phone_number(value: &str) -> String {
    let compact: String = value.chars().filter(|c| !matches!(c, ' ' | '/' | '-')).collect();
    let marked = compact.trim_start_matches('\u{202D}').trim_end_matches('\u{202C}');
    let local = left_strip(marked, "(03)");

    if local.is_empty() {
        String::new()
    } else {
        format!("+4930{}", local)
    }
}

/// Decimal comma coordinate text to decimal point, without quotes
pub fn coordinate_text(value: &str) -> String {
    value.replace('"', "").replace(',', ".")
}

/// `numerator / denominator * 100`, rounded to `decimals` when given.
///
/// Missing operands, a zero denominator and non-finite results all give 0.
pub fn percentage(numerator: Option<f64>, denominator: Option<f64>, decimals: Option<u32>) -> f64 {
    let (Some(n), Some(d)) = (numerator, denominator) else {
        return 0.0;
    };
    if d == 0.0 {
        return 0.0;
    }

    let ratio = n / d * 100.0;
    if !ratio.is_finite() {
        return 0.0;
    }

    match decimals {
        Some(digits) => {
            let scale = 10f64.powi(digits as i32);
            (ratio * scale).round() / scale
        }
        None => ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad("42", 5), "00042");
        assert_eq!(zero_pad("123456", 5), "123456");
        assert_eq!(zero_pad("-42", 5), "-0042");
        assert_eq!(zero_pad("", 2), "00");
    }

    #[test]
    fn test_left_strip() {
        assert_eq!(left_strip("000120", "0"), "120");
        assert_eq!(left_strip("xyabc", "yx"), "abc");
        assert_eq!(left_strip("000", "0"), "");
    }

    #[test]
    fn test_slice_chars() {
        assert_eq!(slice_chars("abcdef", Some(1), Some(4)), "bcd");
        assert_eq!(slice_chars("abcdef", None, Some(2)), "ab");
        assert_eq!(slice_chars("abcdef", Some(-2), None), "ef");
        assert_eq!(slice_chars("abcdef", Some(4), Some(1)), "");
        assert_eq!(slice_chars("äöü", Some(1), None), "öü");
        assert_eq!(slice_chars("abc", Some(-10), Some(10)), "abc");
    }

    #[test]
    fn test_last_chars() {
        assert_eq!(last_chars("11000000", 2), "00");
        assert_eq!(last_chars("7", 3), "7");
    }

    #[test]
    fn test_phone_number() {
        assert_eq!(phone_number("030 / 902 98-0"), "+4930902980");
        assert_eq!(phone_number("(030) 4567 89"), "+4930456789");
        assert_eq!(phone_number("\u{202D}030 123456\u{202C}"), "+4930123456");
        assert_eq!(phone_number("------"), "");
        assert_eq!(phone_number(""), "");
    }

    #[test]
    fn test_coordinate_text() {
        assert_eq!(coordinate_text("\"52,5123\""), "52.5123");
        assert_eq!(coordinate_text("13.4056"), "13.4056");
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(Some(50.0), Some(0.0), Some(2)), 0.0);
        assert_eq!(percentage(Some(25.0), Some(50.0), Some(2)), 50.0);
        assert_eq!(percentage(Some(1.0), Some(3.0), Some(2)), 33.33);
        assert_eq!(percentage(None, Some(3.0), Some(2)), 0.0);
        assert_eq!(percentage(Some(f64::NAN), Some(3.0), None), 0.0);
    }

    proptest! {
        #[test]
        fn prop_zero_pad_width(digits in "[0-9]{0,12}", width in 0usize..16) {
            let padded = zero_pad(&digits, width);
            prop_assert_eq!(padded.chars().count(), digits.len().max(width));
            prop_assert!(padded.ends_with(&digits));
            prop_assert_eq!(zero_pad(&padded, width), padded.clone());
        }

        #[test]
        fn prop_slice_matches_byte_slice_for_ascii(s in "[a-z]{0,10}", a in -12i64..12, b in -12i64..12) {
            let sliced = slice_chars(&s, Some(a), Some(b));
            prop_assert!(sliced.len() <= s.len());
            prop_assert!(s.contains(&sliced));
        }
    }
}
