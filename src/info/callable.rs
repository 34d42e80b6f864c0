//! Callable accessors: functions, callbacks, signatures and arguments.

use crate::{
    schema::blobs::{
        ArgBlob, ArgFlags, CallbackBlob, CommonFlags, FunctionBlob, ScopeKind, SignatureBlob,
        SignatureFlags,
    },
    Error, Result,
};

use super::{InfoCore, TypeInfo};

/// Data flow direction of an argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Caller to callee
    In,
    /// Callee to caller
    Out,
    /// Both directions
    InOut,
}

/// Ownership transfer of a value crossing the call boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Callee/caller keeps ownership
    Nothing,
    /// The container is transferred, its elements are not
    Container,
    /// Full ownership is transferred
    Everything,
}

/// A top-level function or a method of a container.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionInfo {
    pub(crate) core: InfoCore,
}

impl FunctionInfo {
    pub(crate) fn new(core: InfoCore) -> FunctionInfo {
        FunctionInfo { core }
    }

    fn blob(&self) -> FunctionBlob {
        FunctionBlob::read(self.core.data(), self.core.offset).unwrap_or(FunctionBlob {
            blob_type: 0,
            flags: 0,
            name: 0,
            symbol: 0,
            signature: 0,
            flags2: 0,
        })
    }

    /// The function name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// The exported native symbol name.
    pub fn symbol(&self) -> &str {
        self.core.string(self.blob().symbol)
    }

    /// Resolve the native symbol address through the owning typelib's
    /// declared modules.
    ///
    /// # Errors
    /// Returns [`Error::SymbolNotFound`] when no module exports it.
    pub fn symbol_address(&self) -> Result<*const std::ffi::c_void> {
        self.core.typelib.symbol(self.symbol())
    }

    /// Whether the function is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.blob().is_deprecated()
    }

    /// Whether the function takes an instance as its first argument.
    pub fn is_method(&self) -> bool {
        self.blob().is_method()
    }

    /// Whether the function has no instance argument.
    pub fn is_static(&self) -> bool {
        self.blob().is_static()
    }

    /// Whether the function is a constructor.
    pub fn is_constructor(&self) -> bool {
        self.blob().is_constructor()
    }

    /// Whether the function is a property getter.
    pub fn is_getter(&self) -> bool {
        self.blob().is_getter()
    }

    /// Whether the function is a property setter.
    pub fn is_setter(&self) -> bool {
        self.blob().is_setter()
    }

    /// Whether the function wraps a virtual function.
    pub fn wraps_vfunc(&self) -> bool {
        self.blob().wraps_vfunc()
    }

    /// The property or vfunc index this function is tied to, when it is a
    /// getter, setter or vfunc invoker.
    pub fn index(&self) -> Option<u16> {
        let blob = self.blob();
        (blob.is_getter() || blob.is_setter() || blob.wraps_vfunc()).then(|| blob.index())
    }

    /// Whether the function takes a trailing error out-argument.
    pub fn throws(&self) -> bool {
        self.blob().throws()
    }

    /// The function signature.
    pub fn signature(&self) -> SignatureInfo {
        SignatureInfo::new(self.core.at(self.blob().signature as usize))
    }
}

/// A named function pointer type.
#[derive(Clone, Debug, PartialEq)]
pub struct CallbackInfo {
    pub(crate) core: InfoCore,
}

impl CallbackInfo {
    pub(crate) fn new(core: InfoCore) -> CallbackInfo {
        CallbackInfo { core }
    }

    fn blob(&self) -> CallbackBlob {
        CallbackBlob::read(self.core.data(), self.core.offset).unwrap_or(CallbackBlob {
            blob_type: 0,
            flags: CommonFlags::empty(),
            name: 0,
            signature: 0,
        })
    }

    /// The callback name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// Whether the callback is deprecated.
    pub fn is_deprecated(&self) -> bool {
        self.blob().flags.contains(CommonFlags::DEPRECATED)
    }

    /// The callback signature.
    pub fn signature(&self) -> SignatureInfo {
        SignatureInfo::new(self.core.at(self.blob().signature as usize))
    }
}

/// A callable signature: return type, flags, arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct SignatureInfo {
    pub(crate) core: InfoCore,
}

impl SignatureInfo {
    pub(crate) fn new(core: InfoCore) -> SignatureInfo {
        SignatureInfo { core }
    }

    fn blob(&self) -> SignatureBlob {
        SignatureBlob::read(self.core.data(), self.core.offset).unwrap_or(SignatureBlob {
            return_type: crate::schema::SimpleType(0),
            flags: SignatureFlags::empty(),
            n_arguments: 0,
        })
    }

    /// The return type. The descriptor is the first word of the signature.
    pub fn return_type(&self) -> TypeInfo {
        TypeInfo::new(self.core.at(self.core.offset))
    }

    /// Whether the return value may be null.
    pub fn may_return_null(&self) -> bool {
        self.blob().flags.contains(SignatureFlags::MAY_RETURN_NULL)
    }

    /// Ownership transfer of the return value.
    pub fn return_transfer(&self) -> Transfer {
        let flags = self.blob().flags;
        if flags.contains(SignatureFlags::CALLER_OWNS_RETURN_VALUE) {
            Transfer::Everything
        } else if flags.contains(SignatureFlags::CALLER_OWNS_RETURN_CONTAINER) {
            Transfer::Container
        } else {
            Transfer::Nothing
        }
    }

    /// Whether bindings should skip the return value.
    pub fn skip_return(&self) -> bool {
        self.blob().flags.contains(SignatureFlags::SKIP_RETURN)
    }

    /// Whether ownership of the instance is transferred to the callee.
    pub fn instance_transfer(&self) -> bool {
        self.blob().flags.contains(SignatureFlags::INSTANCE_TRANSFER)
    }

    /// Whether the callable takes a trailing error out-argument.
    pub fn throws(&self) -> bool {
        self.blob().flags.contains(SignatureFlags::THROWS)
    }

    /// Number of arguments.
    pub fn n_args(&self) -> usize {
        usize::from(self.blob().n_arguments)
    }

    /// The Nth argument.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] past [`SignatureInfo::n_args`].
    pub fn arg(&self, index: usize) -> Result<ArgInfo> {
        let count = self.n_args();
        if index >= count {
            return Err(Error::IndexOutOfRange { index, count });
        }

        Ok(ArgInfo::new(
            self.core.at(SignatureBlob::arg_offset(self.core.offset, index)),
        ))
    }

    /// Iterate all arguments in order.
    pub fn args(&self) -> impl Iterator<Item = ArgInfo> + '_ {
        (0..self.n_args()).filter_map(|index| self.arg(index).ok())
    }
}

/// One argument of a callable.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgInfo {
    pub(crate) core: InfoCore,
}

impl ArgInfo {
    pub(crate) fn new(core: InfoCore) -> ArgInfo {
        ArgInfo { core }
    }

    fn blob(&self) -> ArgBlob {
        ArgBlob::read(self.core.data(), self.core.offset).unwrap_or(ArgBlob {
            name: 0,
            raw_flags: 0,
            closure: -1,
            destroy: -1,
            arg_type: crate::schema::SimpleType(0),
        })
    }

    /// The argument name.
    pub fn name(&self) -> &str {
        self.core.string(self.blob().name)
    }

    /// Data flow direction.
    pub fn direction(&self) -> Direction {
        let flags = self.blob().flags();
        match (flags.contains(ArgFlags::IN), flags.contains(ArgFlags::OUT)) {
            (true, true) => Direction::InOut,
            (false, true) => Direction::Out,
            _ => Direction::In,
        }
    }

    /// Whether the caller must allocate the out-argument.
    pub fn caller_allocates(&self) -> bool {
        self.blob().flags().contains(ArgFlags::CALLER_ALLOCATES)
    }

    /// Whether the argument may be null.
    pub fn is_nullable(&self) -> bool {
        self.blob().flags().contains(ArgFlags::NULLABLE)
    }

    /// Whether the out-argument may be ignored by passing null.
    pub fn is_optional(&self) -> bool {
        self.blob().flags().contains(ArgFlags::OPTIONAL)
    }

    /// Whether this argument is the return value.
    pub fn is_return_value(&self) -> bool {
        self.blob().flags().contains(ArgFlags::RETURN_VALUE)
    }

    /// Whether bindings should skip this argument.
    pub fn is_skipped(&self) -> bool {
        self.blob().flags().contains(ArgFlags::SKIP)
    }

    /// Ownership transfer of the argument value.
    pub fn transfer(&self) -> Transfer {
        let flags = self.blob().flags();
        if flags.contains(ArgFlags::TRANSFER_OWNERSHIP) {
            Transfer::Everything
        } else if flags.contains(ArgFlags::TRANSFER_CONTAINER) {
            Transfer::Container
        } else {
            Transfer::Nothing
        }
    }

    /// Closure scope, for callback arguments.
    pub fn scope(&self) -> Option<ScopeKind> {
        self.blob().scope().filter(|&scope| scope != ScopeKind::Invalid)
    }

    /// Index of the user-data argument, for callback arguments.
    pub fn closure_index(&self) -> Option<usize> {
        usize::try_from(self.blob().closure).ok()
    }

    /// Index of the destroy-notify argument, for callback arguments.
    pub fn destroy_index(&self) -> Option<usize> {
        usize::try_from(self.blob().destroy).ok()
    }

    /// The argument type. The descriptor is the last word of the blob.
    pub fn type_info(&self) -> TypeInfo {
        TypeInfo::new(self.core.at(self.core.offset + 12))
    }
}
