//! Predicate and projection expression trees.
//!
//! Trees are built by callers and handed to the compiler read-only. Nodes
//! that the compiler cannot lower directly (`Member`, `StaticMember`, `Call`)
//! are rewritten by the dialect's translators into SQL-level nodes such as
//! [`Expression::DatePart`] or [`Expression::Function`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::metadata::{Entity, EntityType, get_entity_type};
use crate::value::{ColumnType, Value};

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
	Equal,
	NotEqual,
	LessThan,
	LessThanOrEqual,
	GreaterThan,
	GreaterThanOrEqual,
	And,
	Or,
	Add,
	Subtract,
	Multiply,
	Divide,
	Modulo,
}

impl BinaryOp {
	pub fn as_sql(&self) -> &'static str {
		match self {
			BinaryOp::Equal => "=",
			BinaryOp::NotEqual => "<>",
			BinaryOp::LessThan => "<",
			BinaryOp::LessThanOrEqual => "<=",
			BinaryOp::GreaterThan => ">",
			BinaryOp::GreaterThanOrEqual => ">=",
			BinaryOp::And => "AND",
			BinaryOp::Or => "OR",
			BinaryOp::Add => "+",
			BinaryOp::Subtract => "-",
			BinaryOp::Multiply => "*",
			BinaryOp::Divide => "/",
			BinaryOp::Modulo => "%",
		}
	}

	pub fn is_comparison(&self) -> bool {
		matches!(
			self,
			BinaryOp::Equal
				| BinaryOp::NotEqual
				| BinaryOp::LessThan
				| BinaryOp::LessThanOrEqual
				| BinaryOp::GreaterThan
				| BinaryOp::GreaterThanOrEqual
		)
	}

	pub fn is_logical(&self) -> bool {
		matches!(self, BinaryOp::And | BinaryOp::Or)
	}
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
	Not,
	Negate,
}

/// Owner of a member or method: the type a `Call` or `StaticMember` belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeOwner {
	String,
	Math,
	Uuid,
	DateTime,
	Convert,
	Object,
	Named(String),
}

impl fmt::Display for TypeOwner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TypeOwner::Named(name) => f.write_str(name),
			other => write!(f, "{:?}", other),
		}
	}
}

/// A method identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
	pub owner: TypeOwner,
	pub name: String,
}

impl Method {
	pub fn new(owner: TypeOwner, name: impl Into<String>) -> Self {
		Self {
			owner,
			name: name.into(),
		}
	}

	pub fn string(name: &str) -> Self {
		Self::new(TypeOwner::String, name)
	}

	pub fn math(name: &str) -> Self {
		Self::new(TypeOwner::Math, name)
	}

	pub fn is(&self, owner: &TypeOwner, name: &str) -> bool {
		&self.owner == owner && self.name == name
	}
}

/// Component extracted from a date or time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
	Year,
	Month,
	Day,
	Hour,
	Minute,
	Second,
	Millisecond,
	DayOfYear,
	/// Sunday = 0
	DayOfWeek,
	/// Date component, time dropped
	Date,
	/// Time component, date dropped
	TimeOfDay,
}

impl DatePart {
	pub fn from_member(member: &str) -> Option<Self> {
		let part = match member {
			"year" => DatePart::Year,
			"month" => DatePart::Month,
			"day" => DatePart::Day,
			"hour" => DatePart::Hour,
			"minute" => DatePart::Minute,
			"second" => DatePart::Second,
			"millisecond" => DatePart::Millisecond,
			"day_of_year" => DatePart::DayOfYear,
			"day_of_week" => DatePart::DayOfWeek,
			"date" => DatePart::Date,
			"time_of_day" => DatePart::TimeOfDay,
			_ => return None,
		};
		Some(part)
	}

	pub fn column_type(&self) -> ColumnType {
		match self {
			DatePart::Date => ColumnType::Date,
			DatePart::TimeOfDay => ColumnType::Time,
			_ => ColumnType::Int,
		}
	}
}

/// Reference to an entity in a query, optionally aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRef {
	pub entity: Arc<EntityType>,
	pub alias: Option<String>,
}

/// A resolved column of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRef {
	pub entity: Arc<EntityType>,
	pub property: String,
	pub alias: Option<String>,
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
	/// The row being queried
	Entity(EntityRef),
	/// A mapped column
	Property(PropertyRef),
	/// Member read on a non-entity value, e.g. `created_at.year`
	Member {
		object: Box<Expression>,
		member: String,
	},
	/// Member of a type rather than a value, e.g. `DateTime::now`
	StaticMember { owner: TypeOwner, member: String },
	/// A captured record whose member reads embed literals
	Captured {
		name: String,
		fields: BTreeMap<String, Value>,
	},
	Constant(Value),
	Parameter { name: String, value: Value },
	Binary {
		op: BinaryOp,
		left: Box<Expression>,
		right: Box<Expression>,
	},
	Unary {
		op: UnaryOp,
		operand: Box<Expression>,
	},
	/// Method invocation, `object` is `None` for static methods
	Call {
		object: Option<Box<Expression>>,
		method: Method,
		arguments: Vec<Expression>,
	},
	Like {
		target: Box<Expression>,
		pattern: Box<Expression>,
		escape: Option<char>,
	},
	/// SQL function, emitted by name
	Function {
		name: String,
		arguments: Vec<Expression>,
	},
	/// Raw SQL emitted verbatim
	Fragment(String),
	DatePart {
		part: DatePart,
		operand: Box<Expression>,
	},
	Concat(Vec<Expression>),
	/// 1-based position of `needle` in `haystack`, 0 when absent
	Position {
		needle: Box<Expression>,
		haystack: Box<Expression>,
	},
	/// Character length
	Length(Box<Expression>),
	Cast {
		operand: Box<Expression>,
		column_type: ColumnType,
	},
	/// Projection item with an output name
	Alias {
		expression: Box<Expression>,
		alias: String,
	},
	/// Comma-separated list, used for projections and orderings
	List(Vec<Expression>),
	Order {
		expression: Box<Expression>,
		descending: bool,
	},
}

impl Expression {
	/// The entity `E` as a query root.
	pub fn entity<E: Entity>() -> Self {
		Expression::Entity(EntityRef {
			entity: get_entity_type::<E>(),
			alias: None,
		})
	}

	/// A column of `E`, failing with `UnknownProperty` for unmapped names.
	pub fn property<E: Entity>(name: &str) -> Result<Self> {
		Self::property_of(get_entity_type::<E>(), name, None)
	}

	/// A column of an aliased entity, for joins.
	pub fn aliased_property<E: Entity>(alias: &str, name: &str) -> Result<Self> {
		Self::property_of(get_entity_type::<E>(), name, Some(alias.to_string()))
	}

	pub fn property_of(entity: Arc<EntityType>, name: &str, alias: Option<String>) -> Result<Self> {
		entity.property(name)?;
		Ok(Expression::Property(PropertyRef {
			entity,
			property: name.to_string(),
			alias,
		}))
	}

	pub fn constant(value: impl Into<Value>) -> Self {
		Expression::Constant(value.into())
	}

	pub fn parameter(name: impl Into<String>, value: impl Into<Value>) -> Self {
		Expression::Parameter {
			name: name.into(),
			value: value.into(),
		}
	}

	pub fn fragment(sql: impl Into<String>) -> Self {
		Expression::Fragment(sql.into())
	}

	pub fn function(name: impl Into<String>, arguments: Vec<Expression>) -> Self {
		Expression::Function {
			name: name.into(),
			arguments,
		}
	}

	pub fn captured(name: impl Into<String>, fields: impl IntoIterator<Item = (String, Value)>) -> Self {
		Expression::Captured {
			name: name.into(),
			fields: fields.into_iter().collect(),
		}
	}

	pub fn static_member(owner: TypeOwner, member: impl Into<String>) -> Self {
		Expression::StaticMember {
			owner,
			member: member.into(),
		}
	}

	pub fn static_call(method: Method, arguments: Vec<Expression>) -> Self {
		Expression::Call {
			object: None,
			method,
			arguments,
		}
	}

	/// Always-true predicate, `1 = 1`.
	pub fn always_true() -> Self {
		Expression::constant(1i32).eq(Expression::constant(1i32))
	}

	pub fn binary(self, op: BinaryOp, right: impl Into<Expression>) -> Self {
		Expression::Binary {
			op,
			left: Box::new(self),
			right: Box::new(right.into()),
		}
	}

	pub fn eq(self, right: impl Into<Expression>) -> Self {
		self.binary(BinaryOp::Equal, right)
	}

	pub fn ne(self, right: impl Into<Expression>) -> Self {
		self.binary(BinaryOp::NotEqual, right)
	}

	pub fn lt(self, right: impl Into<Expression>) -> Self {
		self.binary(BinaryOp::LessThan, right)
	}

	pub fn lte(self, right: impl Into<Expression>) -> Self {
		self.binary(BinaryOp::LessThanOrEqual, right)
	}

	pub fn gt(self, right: impl Into<Expression>) -> Self {
		self.binary(BinaryOp::GreaterThan, right)
	}

	pub fn gte(self, right: impl Into<Expression>) -> Self {
		self.binary(BinaryOp::GreaterThanOrEqual, right)
	}

	pub fn and(self, right: impl Into<Expression>) -> Self {
		self.binary(BinaryOp::And, right)
	}

	pub fn or(self, right: impl Into<Expression>) -> Self {
		self.binary(BinaryOp::Or, right)
	}

	pub fn add(self, right: impl Into<Expression>) -> Self {
		self.binary(BinaryOp::Add, right)
	}

	pub fn sub(self, right: impl Into<Expression>) -> Self {
		self.binary(BinaryOp::Subtract, right)
	}

	pub fn not(self) -> Self {
		Expression::Unary {
			op: UnaryOp::Not,
			operand: Box::new(self),
		}
	}

	pub fn member(self, member: impl Into<String>) -> Self {
		Expression::Member {
			object: Box::new(self),
			member: member.into(),
		}
	}

	pub fn call(self, method: Method, arguments: Vec<Expression>) -> Self {
		Expression::Call {
			object: Some(Box::new(self)),
			method,
			arguments,
		}
	}

	pub fn starts_with(self, pattern: impl Into<Expression>) -> Self {
		self.call(Method::string("starts_with"), vec![pattern.into()])
	}

	pub fn ends_with(self, pattern: impl Into<Expression>) -> Self {
		self.call(Method::string("ends_with"), vec![pattern.into()])
	}

	pub fn contains(self, pattern: impl Into<Expression>) -> Self {
		self.call(Method::string("contains"), vec![pattern.into()])
	}

	pub fn like(self, pattern: impl Into<Expression>) -> Self {
		Expression::Like {
			target: Box::new(self),
			pattern: Box::new(pattern.into()),
			escape: None,
		}
	}

	pub fn alias(self, alias: impl Into<String>) -> Self {
		Expression::Alias {
			expression: Box::new(self),
			alias: alias.into(),
		}
	}

	pub fn asc(self) -> Self {
		Expression::Order {
			expression: Box::new(self),
			descending: false,
		}
	}

	pub fn desc(self) -> Self {
		Expression::Order {
			expression: Box::new(self),
			descending: true,
		}
	}

	pub fn as_constant(&self) -> Option<&Value> {
		match self {
			Expression::Constant(value) => Some(value),
			_ => None,
		}
	}

	pub fn is_null_constant(&self) -> bool {
		matches!(self, Expression::Constant(Value::Null))
	}

	/// Logical result type, where it can be inferred from the tree.
	pub fn column_type(&self) -> Option<ColumnType> {
		match self {
			Expression::Property(p) => p
				.entity
				.find_property(&p.property)
				.map(|prop| prop.column_type().clone()),
			Expression::Constant(value) | Expression::Parameter { value, .. } => value.column_type(),
			Expression::Member { object, member } => match (object.as_ref(), object.column_type()) {
				(Expression::Captured { fields, .. }, _) => fields.get(member).and_then(Value::column_type),
				(_, Some(t)) if t.is_temporal() => DatePart::from_member(member).map(|p| p.column_type()),
				(_, Some(t)) if t.is_text() && member == "length" => Some(ColumnType::Int),
				_ => None,
			},
			Expression::StaticMember { owner, member } => match (owner, member.as_str()) {
				(TypeOwner::DateTime, "today") => Some(ColumnType::Date),
				(TypeOwner::DateTime, _) => Some(ColumnType::DateTime),
				_ => None,
			},
			Expression::Binary { op, left, right } => {
				if op.is_comparison() || op.is_logical() {
					Some(ColumnType::Bool)
				} else {
					left.column_type().or_else(|| right.column_type())
				}
			}
			Expression::Unary { op: UnaryOp::Not, .. } | Expression::Like { .. } => Some(ColumnType::Bool),
			Expression::Unary { operand, .. } => operand.column_type(),
			Expression::Call { object, method, arguments } => match method.owner {
				TypeOwner::String => match method.name.as_str() {
					"starts_with" | "ends_with" | "contains" | "is_null_or_empty" | "equals" => {
						Some(ColumnType::Bool)
					}
					_ => Some(ColumnType::String),
				},
				TypeOwner::Uuid => Some(ColumnType::Uuid),
				TypeOwner::Math => arguments.first().and_then(Expression::column_type),
				_ if method.name == "equals" => Some(ColumnType::Bool),
				_ => object.as_ref().and_then(|o| o.column_type()),
			},
			Expression::DatePart { part, .. } => Some(part.column_type()),
			Expression::Concat(_) => Some(ColumnType::String),
			Expression::Position { .. } | Expression::Length(_) => Some(ColumnType::Int),
			Expression::Cast { column_type, .. } => Some(column_type.clone()),
			Expression::Alias { expression, .. } | Expression::Order { expression, .. } => {
				expression.column_type()
			}
			Expression::Entity(_)
			| Expression::Captured { .. }
			| Expression::Function { .. }
			| Expression::Fragment(_)
			| Expression::List(_) => None,
		}
	}
}

impl From<Value> for Expression {
	fn from(value: Value) -> Self {
		Expression::Constant(value)
	}
}

impl From<&str> for Expression {
	fn from(value: &str) -> Self {
		Expression::Constant(Value::from(value))
	}
}

impl From<String> for Expression {
	fn from(value: String) -> Self {
		Expression::Constant(Value::String(value))
	}
}

impl From<i32> for Expression {
	fn from(value: i32) -> Self {
		Expression::Constant(Value::Int(value))
	}
}

impl From<i64> for Expression {
	fn from(value: i64) -> Self {
		Expression::Constant(Value::BigInt(value))
	}
}

impl From<bool> for Expression {
	fn from(value: bool) -> Self {
		Expression::Constant(Value::Bool(value))
	}
}
