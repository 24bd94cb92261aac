//! Identity metadata carried by instrumented callables

use std::borrow::Cow;
use std::fmt;

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamMeta {
    pub name: Cow<'static, str>,
    /// Source text of the default value, when the callable documents one
    pub default: Option<Cow<'static, str>>,
}

impl ParamMeta {
    pub const fn named(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            default: None,
        }
    }

    pub const fn with_default(name: &'static str, default: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            default: Some(Cow::Borrowed(default)),
        }
    }
}

impl fmt::Display for ParamMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.default {
            Some(default) => write!(f, "{}={}", self.name, default),
            None => f.write_str(&self.name),
        }
    }
}

/// Name, qualified name, docs and parameters of a wrapped callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableMeta {
    name: Cow<'static, str>,
    qualified_name: Cow<'static, str>,
    doc: Option<Cow<'static, str>>,
    params: Cow<'static, [ParamMeta]>,
}

impl CallableMeta {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        Self {
            qualified_name: name.clone(),
            name,
            doc: None,
            params: Cow::Borrowed(&[]),
        }
    }

    pub fn qualified(mut self, qualified_name: impl Into<Cow<'static, str>>) -> Self {
        self.qualified_name = qualified_name.into();
        self
    }

    pub fn doc(mut self, doc: impl Into<Cow<'static, str>>) -> Self {
        let doc = doc.into();
        self.doc = (!doc.trim().is_empty()).then_some(doc);
        self
    }

    pub fn params(mut self, params: impl Into<Cow<'static, [ParamMeta]>>) -> Self {
        self.params = params.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn doc_text(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn param_list(&self) -> &[ParamMeta] {
        &self.params
    }

    /// Name of parameter `index`, `arg<index>` when undeclared.
    pub fn param_name(&self, index: usize) -> Cow<'_, str> {
        match self.params.get(index) {
            Some(param) => Cow::Borrowed(param.name.as_ref()),
            None => Cow::Owned(format!("arg{}", index)),
        }
    }

    /// `name(a, b=1)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// One method of an instrumented type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMeta {
    pub name: Cow<'static, str>,
    pub doc: Option<Cow<'static, str>>,
}

impl MethodMeta {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            doc: None,
        }
    }

    pub const fn documented(name: &'static str, doc: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            doc: Some(Cow::Borrowed(doc)),
        }
    }

    /// Underscore-prefixed methods are forwarded without events.
    pub fn is_public(&self) -> bool {
        is_public_method(&self.name)
    }
}

pub(crate) fn is_public_method(name: &str) -> bool {
    !name.starts_with('_')
}

/// How an instrumented type reports method calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassMode {
    /// One call-announce line per public method call
    #[default]
    Announce,
    /// A full trace frame per public method call
    Trace,
}

/// Dispatch table of an instrumented type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMeta {
    name: Cow<'static, str>,
    doc: Option<Cow<'static, str>>,
    methods: Vec<MethodMeta>,
    mode: ClassMode,
}

impl ClassMeta {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            methods: Vec::new(),
            mode: ClassMode::default(),
        }
    }

    /// Table named after `T`'s last path segment.
    pub fn of<T: ?Sized>() -> Self {
        let full = std::any::type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        let short = base.rsplit("::").next().unwrap_or(base);
        Self::new(short.to_string())
    }

    pub fn doc(mut self, doc: impl Into<Cow<'static, str>>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn method(mut self, method: MethodMeta) -> Self {
        self.methods.push(method);
        self
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = MethodMeta>) -> Self {
        self.methods.extend(methods);
        self
    }

    pub fn mode(mut self, mode: ClassMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc_text(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn class_mode(&self) -> ClassMode {
        self.mode
    }

    pub fn method_list(&self) -> &[MethodMeta] {
        &self.methods
    }

    pub fn find_method(&self, name: &str) -> Option<&MethodMeta> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// True when `name` is listed, or when no methods are listed at all.
    pub fn declares(&self, name: &str) -> bool {
        self.methods.is_empty() || self.find_method(name).is_some()
    }

    /// Public methods in declaration order.
    pub fn public_methods(&self) -> impl Iterator<Item = &MethodMeta> {
        self.methods.iter().filter(|m| m.is_public())
    }
}
