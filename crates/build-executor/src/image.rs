//! Dockerfile별 컨테이너 이미지 빌드와 이미지 이름 규칙

use std::path::Path;

/// Dockerfile 위치에서 이미지 이름을 만듭니다.
///
/// Dockerfile의 부모 디렉토리 이름을 사용하고, 저장소 루트 바로 아래에
/// 있으면 저장소 이름을 사용합니다. 소문자로 바꾸고 영숫자가 아닌
/// 문자는 `-`로 치환한 뒤 `palisade/` 네임스페이스와 `:latest` 태그를
/// 붙입니다.
pub fn image_name_for(dockerfile: &Path, repo_root: &Path, repo_name: &str) -> String {
    let dir = dockerfile.parent().unwrap_or(repo_root);
    let base = if dir == repo_root {
        repo_name.to_owned()
    } else {
        dir.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(repo_name)
            .to_owned()
    };
    format!("palisade/{}:latest", sanitize(&base))
}

fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('-');
        }
    }
    // 전부 치환되어 비어 보이는 이름 방지
    if out.chars().all(|c| c == '-') {
        "image".to_owned()
    } else {
        out
    }
}
