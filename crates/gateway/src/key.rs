//! # オブジェクトキー生成
//!
//! アップロード先オブジェクトの短く衝突しにくい識別子と、
//! Content-Typeから推定した拡張子付きのオブジェクトパスを生成する。
//!
//! キーはオブジェクトの命名にのみ使われ、認可は署名付きURL自体が担う。
//! そのため暗号学的な予測不能性は不要で、62^20 のキー空間で衝突を避ける。

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// キー長（文字数）
pub const KEY_LEN: usize = 20;

/// キーに使用する62文字のアルファベット
pub const ALPHANUM: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// オブジェクトパスの名前空間
pub const OBJECT_PREFIX: &str = "images";

/// プロセス全体で共有するキー生成器。
///
/// 乱数生成器は起動時に一度だけシードされ、Mutexの内側に閉じ込められる。
/// 生成器そのものは外部に公開しない。
pub struct KeyGenerator {
    rng: Mutex<StdRng>,
}

impl KeyGenerator {
    /// 壁時計時刻とプロセスIDからシードした生成器を作成する。
    /// 再起動やレプリカ間で系列が重ならないようにする。
    pub fn new() -> Self {
        Self::from_seed(process_seed())
    }

    /// 指定シードで生成器を作成する。
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// 20文字の英数字キーを生成する。
    ///
    /// 1回の生成で行う20回のサンプリングは同一ロック区間内で行われ、
    /// 並行呼び出しの系列が混ざることはない。
    pub fn next_key(&self) -> String {
        let mut buf = [0u8; KEY_LEN];
        {
            // パニックしたスレッドが残した状態でも生成器は壊れていない
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            for b in buf.iter_mut() {
                *b = ALPHANUM[rng.gen_range(0..ALPHANUM.len())];
            }
        }
        buf.iter().map(|&b| b as char).collect()
    }

    /// `images/{key}.{ext}` 形式のオブジェクトパスを生成する。
    ///
    /// 拡張子を推定できないContent-Typeでは末尾がドットのまま
    /// （`images/{key}.`）になる。
    pub fn object_path(&self, content_type: &str) -> String {
        format!(
            "{OBJECT_PREFIX}/{}.{}",
            self.next_key(),
            extension_for(content_type)
        )
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Content-Typeの部分一致から拡張子を推定する。
///
/// 判定順: `png` → `png`、`jpeg` → `jpg`、`jpg` → `jpg`、それ以外は空文字列。
pub fn extension_for(content_type: &str) -> &'static str {
    if content_type.contains("png") {
        "png"
    } else if content_type.contains("jpeg") || content_type.contains("jpg") {
        "jpg"
    } else {
        ""
    }
}

fn process_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    nanos ^ u64::from(std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn assert_valid_key(key: &str) {
        assert_eq!(key.len(), KEY_LEN, "キー長が不正: {key}");
        assert!(
            key.bytes().all(|b| ALPHANUM.contains(&b)),
            "アルファベット外の文字を含む: {key}"
        );
    }

    #[test]
    fn test_key_shape() {
        let generator = KeyGenerator::new();
        for _ in 0..100 {
            assert_valid_key(&generator.next_key());
        }
    }

    /// 10,000件の並行生成で全キーが相異なることを確認
    #[test]
    fn test_concurrent_keys_are_distinct() {
        let generator = Arc::new(KeyGenerator::new());
        let threads: Vec<_> = (0..16)
            .map(|_| {
                let g = Arc::clone(&generator);
                std::thread::spawn(move || (0..625).map(|_| g.next_key()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for t in threads {
            for key in t.join().unwrap() {
                assert_valid_key(&key);
                assert!(seen.insert(key), "キーが重複した");
            }
        }
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = KeyGenerator::from_seed(42);
        let b = KeyGenerator::from_seed(42);
        assert_eq!(a.next_key(), b.next_key());
        assert_eq!(a.next_key(), b.next_key());
    }

    #[test]
    fn test_extension_inference() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/jpg"), "jpg");
        assert_eq!(extension_for("application/pdf"), "");
        assert_eq!(extension_for(""), "");
    }

    #[test]
    fn test_object_path() {
        let generator = KeyGenerator::new();

        let png = generator.object_path("image/png");
        assert!(png.starts_with("images/"));
        assert!(png.ends_with(".png"));
        assert_eq!(png.len(), "images/".len() + KEY_LEN + ".png".len());

        assert!(generator.object_path("image/jpeg").ends_with(".jpg"));
        assert!(generator.object_path("image/jpg").ends_with(".jpg"));

        // 未知のContent-Typeは拡張子なし・末尾ドット
        let pdf = generator.object_path("application/pdf");
        assert!(pdf.ends_with('.'));
        assert_eq!(pdf.len(), "images/".len() + KEY_LEN + 1);
    }
}
