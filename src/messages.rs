//! User-facing message catalog.
//!
//! Every line the tool prints for a human goes through here so a run can be
//! reported in English (default) or Russian.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ru,
}

impl Locale {
    pub fn messages(self) -> &'static Messages {
        match self {
            Locale::En => &EN,
            Locale::Ru => &RU,
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::En),
            "ru" | "russian" => Ok(Locale::Ru),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => f.write_str("en"),
            Locale::Ru => f.write_str("ru"),
        }
    }
}

/// Message texts for one locale.
///
/// Stage prefixes are completed by the reporter as `"<prefix>: <cause>"`.
#[derive(Debug)]
pub struct Messages {
    pub required_paths: &'static str,
    pub usage: &'static str,
    pub processing_xml_path: &'static str,
    pub processing_xsd_path: &'static str,
    pub getting_current_dir: &'static str,
    pub changing_dir: &'static str,
    pub restoring_dir: &'static str,
    pub reading_xsd: &'static str,
    pub parsing_xsd: &'static str,
    pub reading_xml: &'static str,
    pub parsing_xml: &'static str,
    pub validation_engine: &'static str,
    pub configuration: &'static str,
    pub validation_failed: &'static str,
    pub validation_successful: &'static str,
    pub line: &'static str,
    pub column: &'static str,
    pub suggest_file: &'static str,
    pub suggest_schema: &'static str,
    pub suggest_document: &'static str,
    pub suggest_directory: &'static str,
    pub suggest_config: &'static str,
}

pub static EN: Messages = Messages {
    required_paths: "Error: paths to the XML and XSD files are required",
    usage: "Usage: validate-xml-xsd -xml <path_to_xml_file> -xsd <path_to_xsd_schema>",
    processing_xml_path: "Error processing XML file path",
    processing_xsd_path: "Error processing XSD file path",
    getting_current_dir: "Error getting current directory",
    changing_dir: "Error changing directory to",
    restoring_dir: "Error restoring original directory",
    reading_xsd: "Error reading XSD file",
    parsing_xsd: "Error parsing XSD schema",
    reading_xml: "Error reading XML file",
    parsing_xml: "Error parsing XML document",
    validation_engine: "Error running schema validation",
    configuration: "Configuration error",
    validation_failed: "XML validation failed. Errors:",
    validation_successful: "XML validation completed successfully! The XML file conforms to the XSD schema.",
    line: "line",
    column: "column",
    suggest_file: "Suggestion: check that the file exists and is readable",
    suggest_schema: "Suggestion: check the schema syntax and that every include/import location exists relative to the schema file",
    suggest_document: "Suggestion: check that the XML document is well-formed",
    suggest_directory: "Suggestion: check that the schema directory exists and is accessible",
    suggest_config: "Suggestion: check the configuration file syntax and VALIDATE_XML_XSD_* environment variables",
};

pub static RU: Messages = Messages {
    required_paths: "Ошибка: Требуются пути к файлам XML и XSD",
    usage: "Использование: validate-xml-xsd -xml <путь_к_xml_файлу> -xsd <путь_к_xsd_схеме>",
    processing_xml_path: "Ошибка при обработке пути к XML файлу",
    processing_xsd_path: "Ошибка при обработке пути к XSD файлу",
    getting_current_dir: "Ошибка при получении текущей директории",
    changing_dir: "Ошибка при смене директории на",
    restoring_dir: "Ошибка при восстановлении исходной директории",
    reading_xsd: "Ошибка чтения XSD файла",
    parsing_xsd: "Ошибка при разборе XSD схемы",
    reading_xml: "Ошибка чтения XML файла",
    parsing_xml: "Ошибка при разборе XML документа",
    validation_engine: "Ошибка при выполнении проверки по схеме",
    configuration: "Ошибка конфигурации",
    validation_failed: "Валидация XML не пройдена. Ошибки:",
    validation_successful: "Валидация XML успешно завершена! XML файл соответствует XSD схеме.",
    line: "строка",
    column: "столбец",
    suggest_file: "Совет: проверьте, что файл существует и доступен для чтения",
    suggest_schema: "Совет: проверьте синтаксис схемы и что все include/import пути существуют относительно файла схемы",
    suggest_document: "Совет: проверьте, что XML документ корректно сформирован",
    suggest_directory: "Совет: проверьте, что директория схемы существует и доступна",
    suggest_config: "Совет: проверьте синтаксис файла конфигурации и переменные окружения VALIDATE_XML_XSD_*",
};
