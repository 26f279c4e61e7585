//! 结构化事实块的规范化序列化
//!
//! 同一份事实树经过不同路径（本地采集、远端回读、字符串包装）后
//! 序列化产物可能不同；比较时统一走这里：键递归排序、无空白。

use serde_json::Value;

/// 规范化序列化：对象键递归排序，紧凑输出
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// 事实块专用的比较形式
///
/// 远端可能把事实块作为 JSON 字符串返回（字符串里包着结构），
/// 先尝试解开一层再规范化；null 归一为空串，与缺省字段对齐。
pub fn blob_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(inner) => canonical_string(&inner),
            Err(_) => canonical_string(value),
        },
        _ => canonical_string(value),
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Value 的 Display 即紧凑 JSON，这里借用它做字符串转义
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(v) = map.get(*key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_is_stable() {
        let a = json!({"b": 1, "a": {"d": 4, "c": 3}});
        let b = json!({"a": {"c": 3, "d": 4}, "b": 1});
        assert_eq!(canonical_string(&a), canonical_string(&b));
        assert_eq!(canonical_string(&a), r#"{"a":{"c":3,"d":4},"b":1}"#);
    }

    #[test]
    fn test_no_incidental_whitespace() {
        let v: Value = serde_json::from_str("{ \"a\" : [ 1 , 2 ] }").unwrap();
        assert_eq!(canonical_string(&v), r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_array_order_is_preserved() {
        let a = json!([2, 1]);
        let b = json!([1, 2]);
        assert_ne!(canonical_string(&a), canonical_string(&b));
    }

    #[test]
    fn test_blob_unwraps_string_wrapped_json() {
        let wrapped = Value::String(r#"{"cpu": 8, "arch": "x86_64"}"#.to_string());
        let plain = json!({"arch": "x86_64", "cpu": 8});
        assert_eq!(blob_string(&wrapped), blob_string(&plain));
    }

    #[test]
    fn test_blob_null_is_empty() {
        assert_eq!(blob_string(&Value::Null), "");
    }

    #[test]
    fn test_blob_plain_string_stays_string() {
        let v = Value::String("not json".to_string());
        assert_eq!(blob_string(&v), "\"not json\"");
    }

    #[test]
    fn test_scalar_escaping() {
        let v = json!({"msg": "line\nbreak \"quoted\""});
        let s = canonical_string(&v);
        let back: Value = serde_json::from_str(&s).unwrap();
        assert_eq!(back["msg"], v["msg"]);
    }
}
