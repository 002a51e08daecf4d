//! Filter operations and their alias table.
//!
//! Every operation has a word form (`not_eq`) and a symbolic alias (`!=`).
//! Both spellings are part of the public filter grammar.

use std::fmt;

use dynfields_core::FieldType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Eq,
    NotEq,
    Gt,
    Gteq,
    Lt,
    Lteq,
    StartWith,
    EndWith,
    Contain,
    NotStartWith,
    NotEndWith,
    NotContain,
    IStartWith,
    IEndWith,
    IContain,
    NotIStartWith,
    NotIEndWith,
    NotIContain,
    Include,
    NotInclude,
    AnyGt,
    AnyGteq,
    AnyLt,
    AnyLteq,
    AllGt,
    AllGteq,
    AllLt,
    AllLteq,
    AnyStartWith,
    AllStartWith,
    SizeEq,
    SizeNotEq,
    SizeGt,
    SizeGteq,
    SizeLt,
    SizeLteq,
}

use Operation::*;

const COMPARISONS: &[Operation] = &[Eq, NotEq, Gt, Gteq, Lt, Lteq];

const EQUALITY: &[Operation] = &[Eq, NotEq];

const TEXT: &[Operation] = &[
    Eq,
    NotEq,
    StartWith,
    EndWith,
    Contain,
    NotStartWith,
    NotEndWith,
    NotContain,
    IStartWith,
    IEndWith,
    IContain,
    NotIStartWith,
    NotIEndWith,
    NotIContain,
];

const ORDERED_ARRAY: &[Operation] = &[
    Include, NotInclude, AnyGt, AnyGteq, AnyLt, AnyLteq, AllGt, AllGteq, AllLt, AllLteq, SizeEq,
    SizeNotEq, SizeGt, SizeGteq, SizeLt, SizeLteq,
];

const TEXT_ARRAY: &[Operation] = &[
    Include,
    NotInclude,
    AnyStartWith,
    AllStartWith,
    SizeEq,
    SizeNotEq,
    SizeGt,
    SizeGteq,
    SizeLt,
    SizeLteq,
];

const ENUM_ARRAY: &[Operation] = &[
    Include, NotInclude, SizeEq, SizeNotEq, SizeGt, SizeGteq, SizeLt, SizeLteq,
];

impl Operation {
    pub const ALL: [Operation; 36] = [
        Eq,
        NotEq,
        Gt,
        Gteq,
        Lt,
        Lteq,
        StartWith,
        EndWith,
        Contain,
        NotStartWith,
        NotEndWith,
        NotContain,
        IStartWith,
        IEndWith,
        IContain,
        NotIStartWith,
        NotIEndWith,
        NotIContain,
        Include,
        NotInclude,
        AnyGt,
        AnyGteq,
        AnyLt,
        AnyLteq,
        AllGt,
        AllGteq,
        AllLt,
        AllLteq,
        AnyStartWith,
        AllStartWith,
        SizeEq,
        SizeNotEq,
        SizeGt,
        SizeGteq,
        SizeLt,
        SizeLteq,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Eq => "eq",
            NotEq => "not_eq",
            Gt => "gt",
            Gteq => "gteq",
            Lt => "lt",
            Lteq => "lteq",
            StartWith => "start_with",
            EndWith => "end_with",
            Contain => "contain",
            NotStartWith => "not_start_with",
            NotEndWith => "not_end_with",
            NotContain => "not_contain",
            IStartWith => "istart_with",
            IEndWith => "iend_with",
            IContain => "icontain",
            NotIStartWith => "not_istart_with",
            NotIEndWith => "not_iend_with",
            NotIContain => "not_icontain",
            Include => "include",
            NotInclude => "not_include",
            AnyGt => "any_gt",
            AnyGteq => "any_gteq",
            AnyLt => "any_lt",
            AnyLteq => "any_lteq",
            AllGt => "all_gt",
            AllGteq => "all_gteq",
            AllLt => "all_lt",
            AllLteq => "all_lteq",
            AnyStartWith => "any_start_with",
            AllStartWith => "all_start_with",
            SizeEq => "size_eq",
            SizeNotEq => "size_not_eq",
            SizeGt => "size_gt",
            SizeGteq => "size_gteq",
            SizeLt => "size_lt",
            SizeLteq => "size_lteq",
        }
    }

    pub fn alias(self) -> &'static str {
        match self {
            Eq => "=",
            NotEq => "!=",
            Gt => ">",
            Gteq => ">=",
            Lt => "<",
            Lteq => "<=",
            StartWith => "^",
            EndWith => "$",
            Contain => "~",
            NotStartWith => "!^",
            NotEndWith => "!$",
            NotContain => "!~",
            IStartWith => "^*",
            IEndWith => "$*",
            IContain => "~*",
            NotIStartWith => "!^*",
            NotIEndWith => "!$*",
            NotIContain => "!~*",
            Include => "|=",
            NotInclude => "!|=",
            AnyGt => "|>",
            AnyGteq => "|>=",
            AnyLt => "|<",
            AnyLteq => "|<=",
            AllGt => "&>",
            AllGteq => "&>=",
            AllLt => "&<",
            AllLteq => "&<=",
            AnyStartWith => "|^",
            AllStartWith => "&^",
            SizeEq => "#=",
            SizeNotEq => "#!=",
            SizeGt => "#>",
            SizeGteq => "#>=",
            SizeLt => "#<",
            SizeLteq => "#<=",
        }
    }

    /// Look up an operation by word form or alias. Surrounding whitespace
    /// is ignored; case is not.
    pub fn parse(s: &str) -> Option<Operation> {
        let s = s.trim();
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s || op.alias() == s)
    }

    /// Operations a field of `field_type` can be searched with.
    pub fn for_type(field_type: FieldType) -> &'static [Operation] {
        match field_type {
            FieldType::Boolean | FieldType::Enum => EQUALITY,
            FieldType::Integer | FieldType::Decimal | FieldType::Date | FieldType::DateTime => {
                COMPARISONS
            }
            FieldType::Text => TEXT,
            FieldType::IntegerArray
            | FieldType::DecimalArray
            | FieldType::DateArray
            | FieldType::DateTimeArray => ORDERED_ARRAY,
            FieldType::TextArray => TEXT_ARRAY,
            FieldType::EnumArray => ENUM_ARRAY,
        }
    }

    pub fn supports(self, field_type: FieldType) -> bool {
        Operation::for_type(field_type).contains(&self)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
