//! JVM class files for generated `R` classes, built on `ristretto_classfile`.
//!
//! Only what resource classes need is emitted: static `int`/`int[]` fields, an optional
//! static initializer, a default constructor and the `InnerClasses` attribute.

use crate::error::Result;
use respack_api::{SymbolEntry, SymbolTable, ValueType};
use ristretto_classfile::attributes::{
    ArrayType, Attribute, InnerClass, Instruction, NestedClassAccessFlags,
};
use ristretto_classfile::{
    BaseType, ClassAccessFlags, ClassFile, Constant, ConstantPool, Field, FieldAccessFlags,
    FieldType, JAVA_7, Method, MethodAccessFlags,
};
use std::collections::HashMap;

const OBJECT: &str = "java/lang/Object";

/// Constant pool that hands out one index per distinct utf8, class and integer constant.
struct Constants {
    pool: ConstantPool,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
    integers: HashMap<i32, u16>,
}

impl Constants {
    fn new() -> Self {
        Self {
            pool: ConstantPool::new(),
            utf8: HashMap::new(),
            classes: HashMap::new(),
            integers: HashMap::new(),
        }
    }

    fn utf8(&mut self, value: &str) -> Result<u16> {
        if let Some(&index) = self.utf8.get(value) {
            return Ok(index);
        }
        let index = self.pool.add_utf8(value)?;
        self.utf8.insert(value.to_string(), index);
        Ok(index)
    }

    fn class(&mut self, internal_name: &str) -> Result<u16> {
        if let Some(&index) = self.classes.get(internal_name) {
            return Ok(index);
        }
        let name_index = self.utf8(internal_name)?;
        let index = self.pool.add(Constant::Class(name_index))?;
        self.classes.insert(internal_name.to_string(), index);
        Ok(index)
    }

    fn integer(&mut self, value: i32) -> Result<u16> {
        if let Some(&index) = self.integers.get(&value) {
            return Ok(index);
        }
        let index = self.pool.add_integer(value)?;
        self.integers.insert(value, index);
        Ok(index)
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.utf8(name)?;
        let descriptor_index = self.utf8(descriptor)?;
        Ok(self.pool.add(Constant::NameAndType {
            name_index,
            descriptor_index,
        })?)
    }

    fn field_ref(&mut self, class_index: u16, name: &str, descriptor: &str) -> Result<u16> {
        let name_and_type_index = self.name_and_type(name, descriptor)?;
        Ok(self.pool.add(Constant::FieldRef {
            class_index,
            name_and_type_index,
        })?)
    }

    fn method_ref(&mut self, class_index: u16, name: &str, descriptor: &str) -> Result<u16> {
        let name_and_type_index = self.name_and_type(name, descriptor)?;
        Ok(self.pool.add(Constant::MethodRef {
            class_index,
            name_and_type_index,
        })?)
    }

    /// The shortest instruction that pushes `value`.
    fn push_int(&mut self, value: i32) -> Result<Instruction> {
        let instruction = match value {
            -1 => Instruction::Iconst_m1,
            0 => Instruction::Iconst_0,
            1 => Instruction::Iconst_1,
            2 => Instruction::Iconst_2,
            3 => Instruction::Iconst_3,
            4 => Instruction::Iconst_4,
            5 => Instruction::Iconst_5,
            -128..=127 => Instruction::Bipush(value as i8),
            -32768..=32767 => Instruction::Sipush(value as i16),
            _ => {
                let index = self.integer(value)?;
                match u8::try_from(index) {
                    Ok(index) => Instruction::Ldc(index),
                    Err(_) => Instruction::Ldc_w(index),
                }
            }
        };
        Ok(instruction)
    }
}

struct RClass {
    constants: Constants,
    this_class: u16,
    super_class: u16,
    fields: Vec<Field>,
    methods: Vec<Method>,
    inner_classes: Vec<InnerClass>,
}

impl RClass {
    fn new(internal_name: &str) -> Result<Self> {
        let mut constants = Constants::new();
        let this_class = constants.class(internal_name)?;
        let super_class = constants.class(OBJECT)?;
        Ok(Self {
            constants,
            this_class,
            super_class,
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
        })
    }

    fn add_method(
        &mut self,
        access_flags: MethodAccessFlags,
        name: &str,
        max_stack: u16,
        max_locals: u16,
        code: Vec<Instruction>,
    ) -> Result<()> {
        let name_index = self.constants.utf8(name)?;
        let descriptor_index = self.constants.utf8("()V")?;
        let code_index = self.constants.utf8("Code")?;
        self.methods.push(Method {
            access_flags,
            name_index,
            descriptor_index,
            attributes: vec![Attribute::Code {
                name_index: code_index,
                max_stack,
                max_locals,
                code,
                exception_table: Vec::new(),
                attributes: Vec::new(),
            }],
        });
        Ok(())
    }

    fn add_default_constructor(&mut self) -> Result<()> {
        let object_init = self
            .constants
            .method_ref(self.super_class, "<init>", "()V")?;
        self.add_method(
            MethodAccessFlags::PUBLIC,
            "<init>",
            1,
            1,
            vec![
                Instruction::Aload_0,
                Instruction::Invokespecial(object_init),
                Instruction::Return,
            ],
        )
    }

    fn add_inner_class(&mut self, inner_name: &str, outer_name: &str, simple: &str) -> Result<()> {
        let class_info_index = self.constants.class(inner_name)?;
        let outer_class_info_index = self.constants.class(outer_name)?;
        let name_index = self.constants.utf8(simple)?;
        self.inner_classes.push(InnerClass {
            class_info_index,
            outer_class_info_index,
            name_index,
            access_flags: NestedClassAccessFlags::PUBLIC
                | NestedClassAccessFlags::STATIC
                | NestedClassAccessFlags::FINAL,
        });
        Ok(())
    }

    fn add_field(
        &mut self,
        access_flags: FieldAccessFlags,
        name: &str,
        field_type: FieldType,
        constant: Option<i32>,
    ) -> Result<()> {
        let name_index = self.constants.utf8(name)?;
        let descriptor_index = self.constants.utf8(&field_type.descriptor())?;
        let attributes = match constant {
            Some(value) => vec![Attribute::ConstantValue {
                name_index: self.constants.utf8("ConstantValue")?,
                constant_value_index: self.constants.integer(value)?,
            }],
            None => Vec::new(),
        };
        self.fields.push(Field {
            access_flags,
            name_index,
            descriptor_index,
            field_type,
            attributes,
        });
        Ok(())
    }

    fn to_bytes(mut self) -> Result<Vec<u8>> {
        let mut attributes = Vec::new();
        if !self.inner_classes.is_empty() {
            attributes.push(Attribute::InnerClasses {
                name_index: self.constants.utf8("InnerClasses")?,
                classes: self.inner_classes,
            });
        }

        let class_file = ClassFile {
            version: JAVA_7,
            constant_pool: self.constants.pool,
            access_flags: ClassAccessFlags::PUBLIC
                | ClassAccessFlags::FINAL
                | ClassAccessFlags::SUPER,
            this_class: self.this_class,
            super_class: self.super_class,
            interfaces: Vec::new(),
            fields: self.fields,
            methods: self.methods,
            attributes,
        };
        let mut bytes = Vec::new();
        class_file.to_bytes(&mut bytes)?;
        Ok(bytes)
    }
}

/// A generated class file and its path relative to the classes root.
#[derive(Debug, Clone)]
pub struct GeneratedClass {
    pub relative_path: String,
    pub bytes: Vec<u8>,
}

fn int_type() -> FieldType {
    FieldType::Base(BaseType::Int)
}

fn type_class(
    outer: &str,
    res_type: &str,
    entries: &[&SymbolEntry],
    final_fields: bool,
) -> Result<Vec<u8>> {
    let internal_name = format!("{outer}${res_type}");
    let mut class = RClass::new(&internal_name)?;
    class.add_inner_class(&internal_name, outer, res_type)?;
    class.add_default_constructor()?;

    let access = if final_fields {
        FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL
    } else {
        FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC
    };

    let mut clinit = Vec::new();
    let mut max_stack = 0u16;
    for entry in entries {
        match entry.value_type {
            ValueType::Int => {
                let value = entry.int_value()?;
                if final_fields {
                    class.add_field(access, entry.name(), int_type(), Some(value))?;
                    continue;
                }
                class.add_field(access, entry.name(), int_type(), None)?;
                clinit.push(class.constants.push_int(value)?);
                let field = class
                    .constants
                    .field_ref(class.this_class, entry.name(), "I")?;
                clinit.push(Instruction::Putstatic(field));
                max_stack = max_stack.max(1);
            }
            ValueType::IntArray => {
                let values = entry.array_values()?;
                let field_type = FieldType::Array(Box::new(int_type()));
                class.add_field(access, entry.name(), field_type, None)?;

                clinit.push(class.constants.push_int(values.len() as i32)?);
                clinit.push(Instruction::Newarray(ArrayType::Int));
                for (idx, value) in values.iter().enumerate() {
                    clinit.push(Instruction::Dup);
                    clinit.push(class.constants.push_int(idx as i32)?);
                    clinit.push(class.constants.push_int(*value)?);
                    clinit.push(Instruction::Iastore);
                }
                let field = class
                    .constants
                    .field_ref(class.this_class, entry.name(), "[I")?;
                clinit.push(Instruction::Putstatic(field));
                max_stack = max_stack.max(4);
            }
        }
    }

    if !clinit.is_empty() {
        clinit.push(Instruction::Return);
        class.add_method(MethodAccessFlags::STATIC, "<clinit>", max_stack, 0, clinit)?;
    }

    class.to_bytes()
}

/// Encodes `R` and one `R$<type>` class per resource type for `package`.
pub fn r_classes(
    package: &str,
    table: &SymbolTable,
    final_fields: bool,
) -> Result<Vec<GeneratedClass>> {
    let outer = if package.is_empty() {
        "R".to_string()
    } else {
        format!("{}/R", package.replace('.', "/"))
    };
    let groups = table.by_type();

    let mut r_class = RClass::new(&outer)?;
    r_class.add_default_constructor()?;
    for res_type in groups.keys() {
        r_class.add_inner_class(&format!("{outer}${res_type}"), &outer, res_type)?;
    }

    let mut classes = vec![GeneratedClass {
        relative_path: format!("{outer}.class"),
        bytes: r_class.to_bytes()?,
    }];
    for (res_type, entries) in &groups {
        classes.push(GeneratedClass {
            relative_path: format!("{outer}${res_type}.class"),
            bytes: type_class(&outer, res_type, entries, final_fields)?,
        });
    }
    Ok(classes)
}
