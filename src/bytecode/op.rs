// =============================================================================
// OP - Opcode enumeration
// =============================================================================

/// Bytecode opcodes. The numeric values are part of the binary format and
/// must never be reordered: the encoder writes the discriminant byte
/// directly, and persisted programs depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Op {
    // literals
    Push = 1,

    // integer arithmetic
    AddInt = 2,
    SubInt = 3,
    MulInt = 4,
    DivInt = 5,

    // integer comparison
    LtInt = 6,
    LteInt = 7,
    GtInt = 8,
    GteInt = 9,

    // float arithmetic
    AddFloat = 10,
    SubFloat = 11,
    MulFloat = 12,
    DivFloat = 13,

    // logic
    AndBool = 14,
    OrBool = 15,

    // structural equality, any two values
    Eq = 16,
    Neq = 17,

    // float comparison
    LtFloat = 18,
    LteFloat = 19,
    GtFloat = 20,
    GteFloat = 21,

    // strings
    AddString = 22,

    // control flow
    Jump = 23,
    JumpFalse = 24,
    Return = 25,
    ReturnValue = 26,
    Call = 27,

    // variable storage
    StoreGlobal = 28,
    LoadGlobal = 29,
    LoadLocal = 30,
    StoreLocal = 31,
    LoadFree = 32,

    // closures
    Closure = 33,

    // containers
    Array = 34,
    Hash = 35,
    Index = 36,

    // conversions
    ToFloat = 37,

    // native functions
    Builtin = 38,

    // classes
    Class = 39,
    Access = 40,
}

impl Op {
    /// Decode a raw opcode byte, as read from an encoded tape.
    pub fn from_byte(byte: u8) -> Option<Op> {
        let op = match byte {
            1 => Op::Push,
            2 => Op::AddInt,
            3 => Op::SubInt,
            4 => Op::MulInt,
            5 => Op::DivInt,
            6 => Op::LtInt,
            7 => Op::LteInt,
            8 => Op::GtInt,
            9 => Op::GteInt,
            10 => Op::AddFloat,
            11 => Op::SubFloat,
            12 => Op::MulFloat,
            13 => Op::DivFloat,
            14 => Op::AndBool,
            15 => Op::OrBool,
            16 => Op::Eq,
            17 => Op::Neq,
            18 => Op::LtFloat,
            19 => Op::LteFloat,
            20 => Op::GtFloat,
            21 => Op::GteFloat,
            22 => Op::AddString,
            23 => Op::Jump,
            24 => Op::JumpFalse,
            25 => Op::Return,
            26 => Op::ReturnValue,
            27 => Op::Call,
            28 => Op::StoreGlobal,
            29 => Op::LoadGlobal,
            30 => Op::LoadLocal,
            31 => Op::StoreLocal,
            32 => Op::LoadFree,
            33 => Op::Closure,
            34 => Op::Array,
            35 => Op::Hash,
            36 => Op::Index,
            37 => Op::ToFloat,
            38 => Op::Builtin,
            39 => Op::Class,
            40 => Op::Access,
            _ => return None,
        };
        Some(op)
    }

    /// Upper-case mnemonic, used by the disassembler.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Push => "PUSH",
            Op::AddInt => "ADD_INT",
            Op::SubInt => "SUB_INT",
            Op::MulInt => "MUL_INT",
            Op::DivInt => "DIV_INT",
            Op::LtInt => "LT_INT",
            Op::LteInt => "LTE_INT",
            Op::GtInt => "GT_INT",
            Op::GteInt => "GTE_INT",
            Op::AddFloat => "ADD_FLOAT",
            Op::SubFloat => "SUB_FLOAT",
            Op::MulFloat => "MUL_FLOAT",
            Op::DivFloat => "DIV_FLOAT",
            Op::AndBool => "AND_BOOL",
            Op::OrBool => "OR_BOOL",
            Op::Eq => "EQ",
            Op::Neq => "NEQ",
            Op::LtFloat => "LT_FLOAT",
            Op::LteFloat => "LTE_FLOAT",
            Op::GtFloat => "GT_FLOAT",
            Op::GteFloat => "GTE_FLOAT",
            Op::AddString => "ADD_STRING",
            Op::Jump => "JUMP",
            Op::JumpFalse => "JUMP_FALSE",
            Op::Return => "RETURN",
            Op::ReturnValue => "RETURN_VALUE",
            Op::Call => "CALL",
            Op::StoreGlobal => "STORE_GLOBAL",
            Op::LoadGlobal => "LOAD_GLOBAL",
            Op::LoadLocal => "LOAD_LOCAL",
            Op::StoreLocal => "STORE_LOCAL",
            Op::LoadFree => "LOAD_FREE",
            Op::Closure => "CLOSURE",
            Op::Array => "ARRAY",
            Op::Hash => "HASH",
            Op::Index => "INDEX",
            Op::ToFloat => "TO_FLOAT",
            Op::Builtin => "BUILTIN",
            Op::Class => "CLASS",
            Op::Access => "ACCESS",
        }
    }

    /// Look up an opcode by its lower-case assembler mnemonic.
    pub fn from_mnemonic(text: &str) -> Option<Op> {
        let op = match text {
            "push" => Op::Push,
            "add_int" => Op::AddInt,
            "sub_int" => Op::SubInt,
            "mul_int" => Op::MulInt,
            "div_int" => Op::DivInt,
            "lt_int" => Op::LtInt,
            "lte_int" => Op::LteInt,
            "gt_int" => Op::GtInt,
            "gte_int" => Op::GteInt,
            "add_float" => Op::AddFloat,
            "sub_float" => Op::SubFloat,
            "mul_float" => Op::MulFloat,
            "div_float" => Op::DivFloat,
            "and_bool" => Op::AndBool,
            "or_bool" => Op::OrBool,
            "eq" => Op::Eq,
            "neq" => Op::Neq,
            "lt_float" => Op::LtFloat,
            "lte_float" => Op::LteFloat,
            "gt_float" => Op::GtFloat,
            "gte_float" => Op::GteFloat,
            "add_string" => Op::AddString,
            "jump" => Op::Jump,
            "jump_false" => Op::JumpFalse,
            "return" => Op::Return,
            "return_value" => Op::ReturnValue,
            "call" => Op::Call,
            "store_global" => Op::StoreGlobal,
            "load_global" => Op::LoadGlobal,
            "load_local" => Op::LoadLocal,
            "store_local" => Op::StoreLocal,
            "load_free" => Op::LoadFree,
            "closure" => Op::Closure,
            "array" => Op::Array,
            "hash" => Op::Hash,
            "index" => Op::Index,
            "to_float" => Op::ToFloat,
            "builtin" => Op::Builtin,
            "class" => Op::Class,
            "access" => Op::Access,
            _ => return None,
        };
        Some(op)
    }

    /// Number of operands an instruction carries in memory. The assembler,
    /// disassembler and stack checker all consult this table.
    pub fn operand_count(self) -> usize {
        match self {
            Op::Closure => 2,
            Op::Push
            | Op::Jump
            | Op::JumpFalse
            | Op::Call
            | Op::StoreGlobal
            | Op::LoadGlobal
            | Op::LoadLocal
            | Op::StoreLocal
            | Op::LoadFree
            | Op::Array
            | Op::Hash
            | Op::Builtin => 1,
            _ => 0,
        }
    }

    /// Number of operands written to the binary encoding. Narrower than
    /// `operand_count`: ARRAY, HASH and BUILTIN predate the wire table and
    /// encode without their operand. Changing this would break the format.
    pub fn encoded_operand_count(self) -> usize {
        match self {
            Op::Closure => 2,
            Op::Push
            | Op::Jump
            | Op::JumpFalse
            | Op::Call
            | Op::StoreGlobal
            | Op::LoadGlobal
            | Op::LoadLocal
            | Op::StoreLocal
            | Op::LoadFree => 1,
            _ => 0,
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
