
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::Config;

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Isolated data dir + config per test so parallel tests never collide.
/// Uses the deterministic hashing embedder so nothing downloads weights.
pub fn test_config(name: &str) -> Config {
    let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "shop-search-test-{name}-{}-{counter}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();

    let mut config = Config::load_with(dir.to_str().unwrap());
    config.embedding.model = "hash".to_string();
    config
}

/// Three jeans in one category, differing by color.
pub const JEANS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<products>
  <product>
    <id>1</id>
    <name>Black Skinny Jeans</name>
    <color>Black</color>
    <category>Jeans</category>
    <manufacturer>DenimCo</manufacturer>
    <description><![CDATA[Classic black skinny jeans with stretch.]]></description>
    <price>59.90</price>
  </product>
  <product>
    <id>2</id>
    <name>Blue Ripped Jeans</name>
    <color>Blue</color>
    <category>Jeans</category>
    <manufacturer>DenimCo</manufacturer>
    <description>Trendy blue ripped jeans.</description>
    <price>64.50</price>
  </product>
  <product>
    <id>3</id>
    <name>Grey Relaxed Jeans</name>
    <color>Grey</color>
    <category>Jeans</category>
    <manufacturer>DenimCo</manufacturer>
    <description>Comfortable grey relaxed jeans.</description>
    <price>54.00</price>
  </product>
</products>"#;

/// Five products with no overlap with [`JEANS_FEED`], for retrain tests.
pub const WARDROBE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<products>
  <product>
    <id>201</id>
    <name>Red Cotton Shirt</name>
    <color>Red</color>
    <category>Shirts</category>
  </product>
  <product>
    <id>202</id>
    <name>Green Cotton Shirt</name>
    <color>Green</color>
    <category>Shirts</category>
  </product>
  <product>
    <id>203</id>
    <name>Linen Trousers Beige</name>
    <color>Beige</color>
    <category>Trousers</category>
  </product>
  <product>
    <id>204</id>
    <name>Wool Winter Coat</name>
    <color>Grey</color>
    <category>Coats</category>
    <season>Χειμωνιάτικο</season>
  </product>
  <product>
    <id>205</id>
    <name>Leather Belt Brown</name>
    <color>Brown</color>
    <category>Accessories</category>
  </product>
</products>"#;
