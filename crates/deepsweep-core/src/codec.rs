//! 序列化值编解码（长度前缀 + 类型标签的文本编码）
//!
//! 设计要点：
//! - 检测宽进严出：形似标签即进入严格解码，解不开一律按普通文本处理。
//! - 解码是纯被动的数据还原；对象只还原为惰性键值结构，不附带任何行为。
//! - 往返律：严格可解码的值在未发生替换时 encode(decode(v)) 与原文逐字节相等；
//!   发生替换后输出仍是长度前缀正确的合法编码。编码损坏即存储记录损坏，
//!   这是整个库里唯一不可恢复的故障面。

use crate::error::DecodeError;

/// 解码后的复合值（有序、保键）
///
/// 数组/对象条目以 (键, 值) 对原序保存；键本身也是 Value（整数键或字符串键），
/// 但替换器只会进入值侧。
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// 浮点：载荷原文保留。数值不是替换对象，原文重放即可保证往返逐字节一致，
    /// 不必重度依赖浮点格式化。
    Double(String),
    Str(String),
    Array(Vec<(Value, Value)>),
    Object { class: String, props: Vec<(Value, Value)> },
}

/// 判断存储文本是否为序列化值
///
/// 先裁剪两端空白；`N;` 直接认定；其余必须以 `[aOsibd]:` 开头且能严格解码。
/// 仅形似标签而解不开的值不算序列化（按不透明文本处理）。
pub fn is_serialized(text: &str) -> bool {
    let t = text.trim();
    if t == "N;" {
        return true;
    }
    let b = t.as_bytes();
    if b.len() < 2 || !matches!(b[0], b'a' | b'O' | b's' | b'i' | b'b' | b'd') || b[1] != b':' {
        return false;
    }
    decode(t).is_ok()
}

/// 严格解码：长度前缀必须精确、容器条目数必须齐、输入必须整体耗尽
pub fn decode(text: &str) -> Result<Value, DecodeError> {
    let mut p = Parser { buf: text.as_bytes(), pos: 0 };
    let v = p.parse_value()?;
    if p.pos != p.buf.len() {
        return Err(DecodeError::Trailing(p.pos));
    }
    Ok(v)
}

/// 规范化重编码；字符串长度按（替换后的）字节内容重新计算
pub fn encode(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(v: &Value, out: &mut String) {
    use std::fmt::Write;
    match v {
        Value::Null => out.push_str("N;"),
        Value::Bool(false) => out.push_str("b:0;"),
        Value::Bool(true) => out.push_str("b:1;"),
        Value::Int(n) => {
            let _ = write!(out, "i:{n};");
        }
        Value::Double(raw) => {
            let _ = write!(out, "d:{raw};");
        }
        Value::Str(s) => {
            let _ = write!(out, "s:{}:\"{s}\";", s.len());
        }
        Value::Array(entries) => {
            let _ = write!(out, "a:{}:{{", entries.len());
            for (k, vv) in entries {
                write_value(k, out);
                write_value(vv, out);
            }
            out.push('}');
        }
        Value::Object { class, props } => {
            let _ = write!(out, "O:{}:\"{class}\":{}:{{", class.len(), props.len());
            for (k, vv) in props {
                write_value(k, out);
                write_value(vv, out);
            }
            out.push('}');
        }
    }
}

/// 递归下降解析器（按字节推进；字符串载荷按字节长度切片后校验 UTF-8）
struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn bump(&mut self) -> Result<u8, DecodeError> {
        let b = *self.buf.get(self.pos).ok_or(DecodeError::Eof(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, want: u8, expected: &'static str) -> Result<(), DecodeError> {
        let at = self.pos;
        if self.bump()? != want {
            return Err(DecodeError::Expected { expected, at });
        }
        Ok(())
    }

    fn parse_value(&mut self) -> Result<Value, DecodeError> {
        let at = self.pos;
        match self.bump()? {
            b'N' => {
                self.expect(b';', "`;`")?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':', "`:`")?;
                let at = self.pos;
                let v = match self.bump()? {
                    b'0' => false,
                    b'1' => true,
                    _ => return Err(DecodeError::Expected { expected: "`0` or `1`", at }),
                };
                self.expect(b';', "`;`")?;
                Ok(Value::Bool(v))
            }
            b'i' => {
                self.expect(b':', "`:`")?;
                let n = self.read_int()?;
                self.expect(b';', "`;`")?;
                Ok(Value::Int(n))
            }
            b'd' => {
                self.expect(b':', "`:`")?;
                let raw = self.read_float_raw()?;
                self.expect(b';', "`;`")?;
                Ok(Value::Double(raw))
            }
            b's' => {
                let s = self.read_string_body()?;
                self.expect(b';', "`;`")?;
                Ok(Value::Str(s))
            }
            b'a' => {
                self.expect(b':', "`:`")?;
                let count = self.read_len()?;
                self.expect(b':', "`:`")?;
                self.expect(b'{', "`{`")?;
                let mut entries = Vec::with_capacity(count.min(64));
                for _ in 0..count {
                    let k = self.parse_value()?;
                    let v = self.parse_value()?;
                    entries.push((k, v));
                }
                self.expect(b'}', "`}`")?;
                Ok(Value::Array(entries))
            }
            b'O' => {
                let class = self.read_string_body()?;
                self.expect(b':', "`:`")?;
                let count = self.read_len()?;
                self.expect(b':', "`:`")?;
                self.expect(b'{', "`{`")?;
                let mut props = Vec::with_capacity(count.min(64));
                for _ in 0..count {
                    let k = self.parse_value()?;
                    let v = self.parse_value()?;
                    props.push((k, v));
                }
                self.expect(b'}', "`}`")?;
                Ok(Value::Object { class, props })
            }
            _ => Err(DecodeError::UnknownTag(at)),
        }
    }

    /// `:<len>:"<len 字节>"` （`s` 与 `O` 的公共体；调用前标签已消费）
    fn read_string_body(&mut self) -> Result<String, DecodeError> {
        self.expect(b':', "`:`")?;
        let len = self.read_len()?;
        self.expect(b':', "`:`")?;
        self.expect(b'"', "`\"`")?;
        let at = self.pos;
        let end = at.checked_add(len).ok_or(DecodeError::Eof(at))?;
        let raw = self.buf.get(at..end).ok_or(DecodeError::Eof(self.buf.len()))?;
        let s = std::str::from_utf8(raw)
            .map_err(|_| DecodeError::Expected { expected: "valid utf-8 payload", at })?
            .to_string();
        self.pos = end;
        self.expect(b'"', "`\"`")?;
        Ok(s)
    }

    fn read_int(&mut self) -> Result<i64, DecodeError> {
        let at = self.pos;
        if self.buf.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }
        let digits_from = self.pos;
        while self.buf.get(self.pos).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_from {
            return Err(DecodeError::Expected { expected: "integer", at });
        }
        std::str::from_utf8(&self.buf[at..self.pos])
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(DecodeError::Expected { expected: "integer", at })
    }

    fn read_len(&mut self) -> Result<usize, DecodeError> {
        let at = self.pos;
        while self.buf.get(self.pos).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == at {
            return Err(DecodeError::Expected { expected: "length", at });
        }
        std::str::from_utf8(&self.buf[at..self.pos])
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(DecodeError::Expected { expected: "length", at })
    }

    /// 浮点载荷：读到 `;` 前为止，原文保留；须能按 f64 解析（INF/NAN 亦可）
    fn read_float_raw(&mut self) -> Result<String, DecodeError> {
        let at = self.pos;
        while self.buf.get(self.pos).is_some_and(|b| *b != b';') {
            self.pos += 1;
        }
        let raw = std::str::from_utf8(&self.buf[at..self.pos])
            .map_err(|_| DecodeError::Expected { expected: "float literal", at })?;
        if raw.is_empty() || raw.parse::<f64>().is_err() {
            return Err(DecodeError::Expected { expected: "float literal", at });
        }
        Ok(raw.to_string())
    }
}
