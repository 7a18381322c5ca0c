//! Configuration merge logic
//!
//! Layers merge with:
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)

use serde_json::Value;

/// Deep merge `overlay` onto `base`.
///
/// Arrays replace rather than concatenate, so a project that lists its own
/// tile markers gets exactly that list.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_tag_override() {
        let base = json!({"cache": {"asset_version": "earcheo-v1.1", "tile_version": "earcheo-map-tiles-v1"}});
        let overlay = json!({"cache": {"tile_version": "earcheo-map-tiles-v2"}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["cache"]["tile_version"], "earcheo-map-tiles-v2");
        assert_eq!(result["cache"]["asset_version"], "earcheo-v1.1");
    }

    #[test]
    fn test_marker_list_replaced() {
        let base = json!({"routes": {"tile_markers": ["/api/wms-proxy", "/api/ortofoto-proxy", "/api/history-proxy"]}});
        let overlay = json!({"routes": {"tile_markers": ["/api/zabaged-proxy"]}});
        let result = deep_merge(base, overlay);

        let markers = result["routes"]["tile_markers"].as_array().unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0], "/api/zabaged-proxy");
    }

    #[test]
    fn test_new_section_added() {
        let result = deep_merge(json!({"origin": "https://earcheo.cz"}), json!({"network": {"timeout_seconds": 5}}));
        assert_eq!(result["origin"], "https://earcheo.cz");
        assert_eq!(result["network"]["timeout_seconds"], 5);
    }

    #[test]
    fn test_merge_layers_precedence() {
        let builtin = json!({"origin": "https://earcheo.cz", "network": {"timeout_seconds": 30}});
        let host = json!({"network": {"timeout_seconds": 10}});
        let project = json!({"origin": "http://localhost:5173"});
        let cli = json!({"network": {"timeout_seconds": 2}});

        let result = merge_layers(vec![builtin, host, project, cli]);

        assert_eq!(result["origin"], "http://localhost:5173");
        assert_eq!(result["network"]["timeout_seconds"], 2);
    }

    #[test]
    fn test_merge_no_layers_is_null() {
        assert!(merge_layers(Vec::new()).is_null());
    }
}
