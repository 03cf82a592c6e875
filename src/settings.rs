use crate::instance::{
    BinaryDataFormat, DateTimeFormat, FloatingPointFormat, GuidFormat, IntegerFormat,
};
use crate::value_type::ValueType;

/// Knobs for creating values and tables.
///
/// ```
/// use fvalue::{IntegerFormat, ValueSettings, ValueType};
///
/// let settings = ValueSettings::new()
///     .xml_value_type(ValueType::StringUtf8)
///     .integer_format(IntegerFormat::HEXADECIMAL);
/// assert_eq!(settings.get_integer_format(), Some(IntegerFormat::HEXADECIMAL));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSettings {
    xml_value_type: ValueType,
    integer_format: Option<IntegerFormat>,
    floating_point_format: Option<FloatingPointFormat>,
    binary_data_format: Option<BinaryDataFormat>,
    date_time_format: Option<DateTimeFormat>,
    guid_format: Option<GuidFormat>,
}

impl Default for ValueSettings {
    fn default() -> Self {
        ValueSettings {
            xml_value_type: ValueType::StringUtf8,
            integer_format: None,
            floating_point_format: None,
            binary_data_format: None,
            date_time_format: None,
            guid_format: None,
        }
    }
}

impl ValueSettings {
    pub fn new() -> Self {
        ValueSettings::default()
    }

    /// Type of the values created when reading a table from XML. Must be a string type.
    pub fn xml_value_type(mut self, value_type: ValueType) -> Self {
        self.xml_value_type = value_type;
        self
    }

    /// Applies to signed and unsigned integer types, booleans keep their own format.
    pub fn integer_format(mut self, format: IntegerFormat) -> Self {
        self.integer_format = Some(format);
        self
    }

    pub fn floating_point_format(mut self, format: FloatingPointFormat) -> Self {
        self.floating_point_format = Some(format);
        self
    }

    pub fn binary_data_format(mut self, format: BinaryDataFormat) -> Self {
        self.binary_data_format = Some(format);
        self
    }

    pub fn date_time_format(mut self, format: DateTimeFormat) -> Self {
        self.date_time_format = Some(format);
        self
    }

    pub fn guid_format(mut self, format: GuidFormat) -> Self {
        self.guid_format = Some(format);
        self
    }

    pub fn get_xml_value_type(&self) -> ValueType {
        self.xml_value_type
    }

    pub fn get_integer_format(&self) -> Option<IntegerFormat> {
        self.integer_format
    }

    pub fn get_floating_point_format(&self) -> Option<FloatingPointFormat> {
        self.floating_point_format
    }

    pub fn get_binary_data_format(&self) -> Option<BinaryDataFormat> {
        self.binary_data_format
    }

    pub fn get_date_time_format(&self) -> Option<DateTimeFormat> {
        self.date_time_format
    }

    pub fn get_guid_format(&self) -> Option<GuidFormat> {
        self.guid_format
    }

    /// The format flags a new value of `value_type` starts with.
    pub fn format_flags_for(&self, value_type: ValueType) -> u32 {
        let format = if value_type.is_integer() && value_type != ValueType::Boolean {
            self.integer_format.map(|f| f.bits())
        } else if value_type.is_floating_point() {
            self.floating_point_format.map(|f| f.bits())
        } else if value_type == ValueType::BinaryData {
            self.binary_data_format.map(|f| f.bits())
        } else if value_type.is_date_time() {
            self.date_time_format.map(|f| f.bits())
        } else if value_type == ValueType::Guid {
            self.guid_format.map(|f| f.bits())
        } else {
            None
        };

        format.unwrap_or_else(|| value_type.default_format_flags())
    }
}
