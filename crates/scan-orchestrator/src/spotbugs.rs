//! SpotBugs XML 보고서의 JSON 정규화
//!
//! `-xml:withMessages` 출력의 `BugInstance` 요소를 집계기가 소비하는
//! 균일한 JSON 배열로 변환합니다. 파싱 불가능한 XML은 빈 배열입니다.

use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::{Value, json};
use tracing::debug;

/// SpotBugs XML 보고서를 JSON 배열로 정규화합니다.
///
/// 각 원소는 `{"type", "priority", "category", "message"}` 형태이며,
/// priority는 정수입니다 (1=높음, 2=중간, 그 외 낮음).
pub fn normalize_report(xml: &str) -> Value {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut bugs = Vec::new();
    let mut current: Option<(String, i64, String)> = None;
    let mut in_long_message = false;
    let mut message = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"BugInstance" => {
                    current = Some(bug_attrs(&e));
                    message.clear();
                }
                b"LongMessage" if current.is_some() => in_long_message = true,
                _ => {}
            },
            // 자기 닫힘 BugInstance (메시지 없음)
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"BugInstance" => {
                let (bug_type, priority, category) = bug_attrs(&e);
                bugs.push(json!({
                    "type": bug_type,
                    "priority": priority,
                    "category": category,
                    "message": "",
                }));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"BugInstance" => {
                    if let Some((bug_type, priority, category)) = current.take() {
                        bugs.push(json!({
                            "type": bug_type,
                            "priority": priority,
                            "category": category,
                            "message": message.clone(),
                        }));
                    }
                }
                b"LongMessage" => in_long_message = false,
                _ => {}
            },
            Ok(Event::Text(t)) if in_long_message => {
                if let Ok(text) = t.unescape() {
                    message.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "unparsable spotbugs report, returning empty");
                return json!([]);
            }
        }
    }

    Value::Array(bugs)
}

fn bug_attrs(e: &quick_xml::events::BytesStart<'_>) -> (String, i64, String) {
    let mut bug_type = String::new();
    let mut priority = 0i64;
    let mut category = String::new();
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.local_name().as_ref() {
            b"type" => bug_type = value,
            b"priority" => priority = value.parse().unwrap_or(0),
            b"category" => category = value,
            _ => {}
        }
    }
    (bug_type, priority, category)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<BugCollection version="4.8.3">
  <BugInstance type="SQL_INJECTION" priority="1" category="SECURITY">
    <LongMessage>SQL injection in UserDao.find</LongMessage>
    <Class classname="com.example.UserDao"/>
  </BugInstance>
  <BugInstance type="HARD_CODE_PASSWORD" priority="2" category="SECURITY">
    <LongMessage>Hardcoded password</LongMessage>
  </BugInstance>
  <BugInstance type="DM_DEFAULT_ENCODING" priority="3" category="I18N"/>
</BugCollection>"#;

    #[test]
    fn extracts_all_bug_instances() {
        let value = normalize_report(SAMPLE);
        let bugs = value.as_array().unwrap();
        assert_eq!(bugs.len(), 3);
        assert_eq!(bugs[0]["type"], "SQL_INJECTION");
        assert_eq!(bugs[0]["priority"], 1);
        assert_eq!(bugs[0]["message"], "SQL injection in UserDao.find");
        assert_eq!(bugs[2]["message"], "");
    }

    #[test]
    fn empty_collection_yields_empty_array() {
        let value = normalize_report("<BugCollection/>");
        assert!(value.as_array().unwrap().is_empty());
    }

    #[test]
    fn malformed_xml_yields_empty_array() {
        let value = normalize_report("<BugCollection><BugInstance");
        assert!(value.as_array().unwrap().is_empty());
    }

    #[test]
    fn non_numeric_priority_defaults_to_zero() {
        let xml = r#"<BugCollection><BugInstance type="X" priority="abc" category="C"/></BugCollection>"#;
        let value = normalize_report(xml);
        assert_eq!(value.as_array().unwrap()[0]["priority"], 0);
    }
}
