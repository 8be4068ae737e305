//! Test fixture: assembles minimal but well-formed class files.
#![allow(dead_code)]

use std::collections::HashMap;

struct Pool {
    bytes: Vec<u8>,
    next: u16,
    utf8: HashMap<String, u16>,
}

impl Pool {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            next: 1,
            utf8: HashMap::new(),
        }
    }

    fn utf8(&mut self, s: &str) -> u16 {
        if let Some(i) = self.utf8.get(s) {
            return *i;
        }
        let i = self.next;
        self.bytes.push(1);
        self.bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(s.as_bytes());
        self.next += 1;
        self.utf8.insert(s.to_string(), i);
        i
    }

    fn raw_string(&mut self, raw: &[u8]) -> u16 {
        let utf8 = self.next;
        self.bytes.push(1);
        self.bytes.extend_from_slice(&(raw.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(raw);
        let i = utf8 + 1;
        self.bytes.push(8);
        self.bytes.extend_from_slice(&utf8.to_be_bytes());
        self.next += 2;
        i
    }

    fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(&name.replace('.', "/"));
        let i = self.next;
        self.bytes.push(7);
        self.bytes.extend_from_slice(&name_index.to_be_bytes());
        self.next += 1;
        i
    }

    fn integer(&mut self, value: i32) -> u16 {
        let i = self.next;
        self.bytes.push(3);
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self.next += 1;
        i
    }

    fn long(&mut self, value: i64) -> u16 {
        let i = self.next;
        self.bytes.push(5);
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self.next += 2;
        i
    }
}

#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    name: String,
    super_class: String,
    interfaces: Vec<String>,
    visible: Vec<(String, bool)>,
    invisible: Vec<String>,
    strings: Vec<Vec<u8>>,
    members: bool,
}

impl ClassFileBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            super_class: "java.lang.Object".to_string(),
            interfaces: Vec::new(),
            visible: Vec::new(),
            invisible: Vec::new(),
            strings: Vec::new(),
            members: false,
        }
    }

    pub fn super_class(mut self, name: &str) -> Self {
        self.super_class = name.to_string();
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    pub fn annotation(mut self, name: &str) -> Self {
        self.visible.push((name.to_string(), false));
        self
    }

    /// Runtime-visible annotation carrying one element value of every kind.
    pub fn annotation_with_values(mut self, name: &str) -> Self {
        self.visible.push((name.to_string(), true));
        self
    }

    pub fn invisible_annotation(mut self, name: &str) -> Self {
        self.invisible.push(name.to_string());
        self
    }

    /// Adds a String constant whose Utf8 entry holds `raw` as is.
    pub fn string_constant(mut self, raw: &[u8]) -> Self {
        self.strings.push(raw.to_vec());
        self
    }

    /// Adds a field, a method and a long constant.
    pub fn with_members(mut self) -> Self {
        self.members = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = Pool::new();
        let this_class = pool.class(&self.name);
        let super_class = pool.class(&self.super_class);
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();
        for raw in &self.strings {
            pool.raw_string(raw);
        }

        let mut body = Vec::new();
        body.extend_from_slice(&0x0021u16.to_be_bytes());
        body.extend_from_slice(&this_class.to_be_bytes());
        body.extend_from_slice(&super_class.to_be_bytes());
        body.extend_from_slice(&(interfaces.len() as u16).to_be_bytes());
        for i in &interfaces {
            body.extend_from_slice(&i.to_be_bytes());
        }

        if self.members {
            let long_index = pool.long(1 << 40);
            // one field with a ConstantValue attribute
            body.extend_from_slice(&1u16.to_be_bytes());
            let (name, desc, attr) = (pool.utf8("big"), pool.utf8("J"), pool.utf8("ConstantValue"));
            for v in [0x0019u16, name, desc, 1, attr] {
                body.extend_from_slice(&v.to_be_bytes());
            }
            body.extend_from_slice(&2u32.to_be_bytes());
            body.extend_from_slice(&long_index.to_be_bytes());
            // one method with an opaque Code attribute
            body.extend_from_slice(&1u16.to_be_bytes());
            let (name, desc, attr) = (pool.utf8("run"), pool.utf8("()V"), pool.utf8("Code"));
            for v in [0x0001u16, name, desc, 1, attr] {
                body.extend_from_slice(&v.to_be_bytes());
            }
            body.extend_from_slice(&5u32.to_be_bytes());
            body.extend_from_slice(&[0, 1, 0, 1, 0xB1]);
        } else {
            body.extend_from_slice(&0u16.to_be_bytes());
            body.extend_from_slice(&0u16.to_be_bytes());
        }

        let mut attributes = Vec::new();
        if !self.visible.is_empty() {
            let mut anns = Vec::new();
            anns.extend_from_slice(&(self.visible.len() as u16).to_be_bytes());
            for (name, with_values) in &self.visible {
                anns.extend_from_slice(&pool.utf8(&descriptor(name)).to_be_bytes());
                if *with_values {
                    write_all_element_kinds(&mut pool, &mut anns);
                } else {
                    anns.extend_from_slice(&0u16.to_be_bytes());
                }
            }
            attributes.push((pool.utf8("RuntimeVisibleAnnotations"), anns));
        }
        if !self.invisible.is_empty() {
            let mut anns = Vec::new();
            anns.extend_from_slice(&(self.invisible.len() as u16).to_be_bytes());
            for name in &self.invisible {
                anns.extend_from_slice(&pool.utf8(&descriptor(name)).to_be_bytes());
                anns.extend_from_slice(&0u16.to_be_bytes());
            }
            attributes.push((pool.utf8("RuntimeInvisibleAnnotations"), anns));
        }
        let source_file = pool.utf8("SourceFile");
        let source_name = pool.utf8("Generated.java");
        attributes.push((source_file, source_name.to_be_bytes().to_vec()));

        body.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
        for (name, data) in attributes {
            body.extend_from_slice(&name.to_be_bytes());
            body.extend_from_slice(&(data.len() as u32).to_be_bytes());
            body.extend_from_slice(&data);
        }

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&52u16.to_be_bytes());
        out.extend_from_slice(&pool.next.to_be_bytes());
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&body);
        out
    }
}

fn descriptor(class_name: &str) -> String {
    format!("L{};", class_name.replace('.', "/"))
}

fn push(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn write_all_element_kinds(pool: &mut Pool, out: &mut Vec<u8>) {
    push(out, 5);

    push(out, pool.utf8("count"));
    out.push(b'I');
    push(out, pool.integer(3));

    push(out, pool.utf8("label"));
    out.push(b's');
    push(out, pool.utf8("hello"));

    push(out, pool.utf8("kind"));
    out.push(b'e');
    push(out, pool.utf8("Lcom/example/Kind;"));
    push(out, pool.utf8("FAST"));

    push(out, pool.utf8("nested"));
    out.push(b'@');
    push(out, pool.utf8("Lcom/example/Inner;"));
    push(out, 1);
    push(out, pool.utf8("value"));
    out.push(b'Z');
    push(out, pool.integer(1));

    push(out, pool.utf8("types"));
    out.push(b'[');
    push(out, 2);
    out.push(b'c');
    push(out, pool.utf8("Ljava/lang/String;"));
    out.push(b'c');
    push(out, pool.utf8("V"));
}
