//! 深度替换（递归遍历解码值，只动字符串叶子）
use crate::codec::Value;
use crate::pattern::Pattern;

/// 普通文本路径：替换所有非重叠命中，返回 (新文本, 命中数)
pub fn replace_text(text: &str, pattern: &Pattern, replacement: &str) -> (String, usize) {
    pattern.replace_all(text, replacement)
}

/// 递归替换解码值中的所有字符串叶子，返回 (新值, 命中总数)
///
/// 数组/对象只进入值侧，键原样保留；Null/Bool/Int/Double 原样透传。
pub fn deep_replace(value: Value, pattern: &Pattern, replacement: &str) -> (Value, usize) {
    let mut matches = 0;
    let v = walk(value, pattern, replacement, &mut matches);
    (v, matches)
}

fn walk(v: Value, pattern: &Pattern, replacement: &str, matches: &mut usize) -> Value {
    match v {
        Value::Str(s) => {
            let (new, n) = pattern.replace_all(&s, replacement);
            *matches += n;
            Value::Str(new)
        }
        Value::Array(entries) => Value::Array(
            entries
                .into_iter()
                .map(|(k, vv)| (k, walk(vv, pattern, replacement, matches)))
                .collect(),
        ),
        Value::Object { class, props } => Value::Object {
            class,
            props: props
                .into_iter()
                .map(|(k, vv)| (k, walk(vv, pattern, replacement, matches)))
                .collect(),
        },
        other => other,
    }
}
