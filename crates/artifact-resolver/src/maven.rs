//! Maven pom.xml의 `<module>` 선언 파싱
//!
//! 애그리게이터 pom의 `<modules>` 블록에서 하위 모듈의 상대 경로를
//! 추출합니다. 네임스페이스와 프로파일 내부 선언을 모두 허용하고,
//! 파싱 실패 시에는 빈 목록을 반환하여 해당 기술자를 독립 루트로
//! 취급합니다.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::warn;

/// pom.xml 내용에서 선언된 모듈의 상대 경로 목록을 추출합니다.
///
/// 파싱 불가한 XML은 에러가 아니라 빈 목록입니다. 모듈 선언을 읽지
/// 못한 기술자는 그래프에서 나가는 간선이 없는 루트 후보로 남습니다.
pub fn parse_declared_modules(content: &str) -> Vec<String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut modules = Vec::new();
    let mut in_modules = false;
    let mut in_module = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"modules" => in_modules = true,
                b"module" if in_modules => in_module = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"modules" => in_modules = false,
                b"module" => in_module = false,
                _ => {}
            },
            Ok(Event::Text(t)) if in_module => {
                if let Ok(text) = t.unescape() {
                    let text = text.trim();
                    if !text.is_empty() {
                        modules.push(text.to_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "failed to parse pom.xml, treating as standalone root");
                return Vec::new();
            }
        }
    }

    modules
}

/// pom.xml 파일을 읽어 모듈 선언을 추출합니다. 읽기 실패는 빈 목록입니다.
pub fn declared_modules_from_file(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_declared_modules(&content),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read pom.xml");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aggregator_modules() {
        let pom = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modelVersion>4.0.0</modelVersion>
    <groupId>com.example</groupId>
    <artifactId>parent</artifactId>
    <packaging>pom</packaging>
    <modules>
        <module>service-a</module>
        <module>service-b</module>
        <module>libs/common</module>
    </modules>
</project>"#;
        let modules = parse_declared_modules(pom);
        assert_eq!(modules, vec!["service-a", "service-b", "libs/common"]);
    }

    #[test]
    fn leaf_pom_has_no_modules() {
        let pom = r#"<project>
    <artifactId>leaf</artifactId>
    <dependencies>
        <dependency><artifactId>module</artifactId></dependency>
    </dependencies>
</project>"#;
        // dependencies 안의 artifactId 텍스트는 수집되지 않아야 합니다
        assert!(parse_declared_modules(pom).is_empty());
    }

    #[test]
    fn module_outside_modules_block_is_ignored() {
        let pom = r#"<project>
    <module>stray</module>
    <modules><module>real</module></modules>
</project>"#;
        assert_eq!(parse_declared_modules(pom), vec!["real"]);
    }

    #[test]
    fn malformed_xml_yields_empty() {
        let pom = "<project><modules><module>a</modules>";
        assert!(parse_declared_modules(pom).is_empty());
    }

    #[test]
    fn empty_content_yields_empty() {
        assert!(parse_declared_modules("").is_empty());
    }

    #[test]
    fn whitespace_in_module_text_is_trimmed() {
        let pom = "<project><modules><module>  core \n</module></modules></project>";
        assert_eq!(parse_declared_modules(pom), vec!["core"]);
    }

    #[test]
    fn namespaced_pom_is_tolerated() {
        let pom = r#"<m:project xmlns:m="http://maven.apache.org/POM/4.0.0">
    <m:modules><m:module>child</m:module></m:modules>
</m:project>"#;
        assert_eq!(parse_declared_modules(pom), vec!["child"]);
    }

    #[test]
    fn nonexistent_file_yields_empty() {
        let modules = declared_modules_from_file(Path::new("/nonexistent/pom.xml"));
        assert!(modules.is_empty());
    }
}
