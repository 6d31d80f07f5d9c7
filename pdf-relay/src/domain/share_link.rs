// pdf-relay/src/domain/share_link.rs

//! 共有リンクからファイルIDを取り出す
//!
//! 対応する形式:
//! - `https://drive.google.com/file/d/<id>/view?usp=sharing`
//! - `https://drive.google.com/open?id=<id>` / `.../uc?export=download&id=<id>`
//!
//! パス形式が優先される。URLとして解釈できない入力は「見つからない」と同じ扱い。

use serde::Serialize;
use std::fmt;
use url::Url;

/// ファイルホスト上のファイルID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// ID として妥当な文字列のみ受け付ける（`[A-Za-z0-9_-]+`）
    pub fn new(value: &str) -> Option<Self> {
        let valid = !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 正規のダウンロードURLを組み立てる。確認トークンがあればクエリに付与する。
    pub fn download_url(&self, base: &str, confirm: Option<&str>) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(base)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("export", "download");
            query.append_pair("id", &self.0);
            if let Some(token) = confirm {
                query.append_pair("confirm", token);
            }
        }
        Ok(url)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 共有リンクからファイルIDを抽出する
pub fn resolve_resource_id(link: &str) -> Option<ResourceId> {
    let url = Url::parse(link.trim()).ok()?;
    id_from_path(&url).or_else(|| id_from_query(&url))
}

// .../file/d/<id>/...
fn id_from_path(url: &Url) -> Option<ResourceId> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    segments
        .windows(3)
        .find(|w| w[0] == "file" && w[1] == "d")
        .and_then(|w| ResourceId::new(w[2]))
}

fn id_from_query(url: &Url) -> Option<ResourceId> {
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .and_then(|(_, value)| ResourceId::new(&value))
}
