//! Anomaly model : failures carried as values, never thrown to callers.
//!
//! Every stage of the request pipeline converts raised errors into an
//! [`Anomaly`] at its boundary. The category set is closed and mirrors the
//! server's own taxonomy, so a decoded body can carry an anomaly verbatim.

mod private
{
  use core::fmt;
  use serde::{ Serialize, Deserialize };

  use crate::Value;

  /// Closed set of anomaly categories.
  ///
  /// # Examples
  ///
  /// ```
  /// use api_datomic::Category;
  ///
  /// assert_eq!( Category::parse( "busy" ), Some( Category::Busy ) );
  /// assert_eq!( Category::parse( ":cognitect.anomalies/not-found" ), Some( Category::NotFound ) );
  /// assert_eq!( Category::Busy.as_str(), "busy" );
  /// ```
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize ) ]
  pub enum Category
  {
    /// Client-side mistake, maps from 4xx statuses.
    Incorrect,
    /// Authentication or authorization rejection, maps from 403.
    Forbidden,
    /// Transient overload, maps from 503 and throttled transports. Retried.
    Busy,
    /// Endpoint unreachable, maps from 504 and connect failures.
    Unavailable,
    /// Name resolution failure.
    NotFound,
    /// Deadline expiry.
    Interrupted,
    /// Everything else : 5xx, decode errors, unclassified transport faults.
    Fault,
  }

  impl Category
  {
    /// Canonical tag for the category.
    #[ must_use ]
    pub fn as_str( self ) -> &'static str
    {
      match self
      {
        Self::Incorrect => "incorrect",
        Self::Forbidden => "forbidden",
        Self::Busy => "busy",
        Self::Unavailable => "unavailable",
        Self::NotFound => "not-found",
        Self::Interrupted => "interrupted",
        Self::Fault => "fault",
      }
    }

    /// Parse a category tag as it may appear in a decoded body.
    ///
    /// Accepts a bare name, a leading `:`, or a fully qualified
    /// `cognitect.anomalies/<name>` keyword. Older peers spell
    /// `unavailable` as `unvailable`; that spelling is accepted on input
    /// but never emitted.
    #[ must_use ]
    pub fn parse( tag : &str ) -> Option< Self >
    {
      let tag = tag.strip_prefix( ':' ).unwrap_or( tag );
      let tag = tag.rsplit( '/' ).next().unwrap_or( tag );
      match tag
      {
        "incorrect" => Some( Self::Incorrect ),
        "forbidden" => Some( Self::Forbidden ),
        "busy" => Some( Self::Busy ),
        "unavailable" | "unvailable" => Some( Self::Unavailable ),
        "not-found" => Some( Self::NotFound ),
        "interrupted" => Some( Self::Interrupted ),
        "fault" => Some( Self::Fault ),
        _ => None,
      }
    }
  }

  impl fmt::Display for Category
  {
    fn fmt( &self, f : &mut fmt::Formatter< '_ > ) -> fmt::Result
    {
      f.write_str( self.as_str() )
    }
  }

  /// A failure value.
  ///
  /// Carries a [`Category`], an optional human-readable message, and, for
  /// HTTP-status failures, the decoded response body.
  ///
  /// # Examples
  ///
  /// ```
  /// use api_datomic::{ Anomaly, Category };
  ///
  /// let anomaly = Anomaly::new( Category::Busy ).with_message( "back off".to_string() );
  /// assert_eq!( anomaly.category(), Category::Busy );
  /// assert!( anomaly.to_string().contains( "back off" ) );
  /// ```
  #[ derive( Debug, Clone, PartialEq ) ]
  pub struct Anomaly
  {
    category : Category,
    message : Option< String >,
    http_result : Option< Value >,
  }

  impl Anomaly
  {
    /// Create an anomaly with no message.
    #[ must_use ]
    pub fn new( category : Category ) -> Self
    {
      Self { category, message : None, http_result : None }
    }

    /// Create an `incorrect` anomaly with a message.
    #[ must_use ]
    pub fn incorrect( message : impl Into< String > ) -> Self
    {
      Self::new( Category::Incorrect ).with_message( message.into() )
    }

    /// Create a `fault` anomaly with a message.
    #[ must_use ]
    pub fn fault( message : impl Into< String > ) -> Self
    {
      Self::new( Category::Fault ).with_message( message.into() )
    }

    /// Create an `interrupted` anomaly with a message.
    #[ must_use ]
    pub fn interrupted( message : impl Into< String > ) -> Self
    {
      Self::new( Category::Interrupted ).with_message( message.into() )
    }

    /// Attach a message.
    #[ must_use ]
    pub fn with_message( mut self, message : String ) -> Self
    {
      self.message = Some( message );
      self
    }

    /// Attach the decoded body of an HTTP error response.
    #[ must_use ]
    pub fn with_http_result( mut self, body : Value ) -> Self
    {
      self.http_result = Some( body );
      self
    }

    /// The category tag.
    #[ must_use ]
    pub fn category( &self ) -> Category
    {
      self.category
    }

    /// The optional message.
    #[ must_use ]
    pub fn message( &self ) -> Option< &str >
    {
      self.message.as_deref()
    }

    /// The decoded body of the failing HTTP response, when one exists.
    #[ must_use ]
    pub fn http_result( &self ) -> Option< &Value >
    {
      self.http_result.as_ref()
    }

    /// True when the category is `busy`. Only busy anomalies are retried.
    #[ must_use ]
    pub fn is_busy( &self ) -> bool
    {
      self.category == Category::Busy
    }

    /// Extract an anomaly carried inside a decoded body, if any.
    ///
    /// A body carries an anomaly iff it is a mapping with a
    /// `cognitect.anomalies/category` field holding a recognizable tag.
    #[ must_use ]
    pub fn from_body( body : &Value ) -> Option< Self >
    {
      let tag = body.get( "cognitect.anomalies/category" )?;
      let category = match tag
      {
        Value::Keyword( k ) => Category::parse( &k.qualified() )?,
        Value::Str( s ) => Category::parse( s )?,
        _ => return None,
      };
      let message = match body.get( "cognitect.anomalies/message" )
      {
        Some( Value::Str( s ) ) => Some( s.clone() ),
        _ => None,
      };
      Some( Self { category, message, http_result : None } )
    }

    /// True iff the decoded body carries an anomaly category field.
    #[ must_use ]
    pub fn is_anomalous( body : &Value ) -> bool
    {
      Self::from_body( body ).is_some()
    }
  }

  impl fmt::Display for Anomaly
  {
    fn fmt( &self, f : &mut fmt::Formatter< '_ > ) -> fmt::Result
    {
      match &self.message
      {
        Some( message ) => write!( f, "{} : {}", self.category, message ),
        None => write!( f, "{}", self.category ),
      }
    }
  }

  impl std::error::Error for Anomaly {}

  /// Result alias used across the whole pipeline.
  pub type DatomicResult< T > = core::result::Result< T, Anomaly >;
}

crate::mod_interface!
{
  exposed use Category;
  exposed use Anomaly;
  exposed use DatomicResult;
}
