//! Request dispatcher : marshal, sign, submit with retry, classify, and
//! deliver on a single-shot channel.

mod private
{
  use core::time::Duration;
  use std::sync::Arc;

  use tokio::sync::oneshot;

  use crate::
  {
    Anomaly, ConnectionImpl, DatomicResult, Marshalled, Op, Value,
    build_request, busy_backoff, marshal, with_retry,
  };
  use crate::classify::classify;

  /// First busy wait, in milliseconds.
  pub const RETRY_START_MSEC : u64 = 100;
  /// Ceiling on a single busy wait, in milliseconds.
  pub const RETRY_MAX_MSEC : u64 = 200;
  /// Multiplier applied per busy response.
  pub const RETRY_FACTOR : u64 = 2;

  /// One logical request : the operation, its payload mapping, and the
  /// fields that ride outside the marshalled body.
  #[ derive( Debug, Clone ) ]
  pub struct ApiRequest
  {
    /// The operation.
    pub op : Op,
    /// Payload mapping; marshalled as the request body.
    pub payload : Value,
    /// Per-request timeout override in milliseconds.
    pub timeout : Option< u64 >,
    /// Continuation token, carried as a header.
    pub next_token : Option< String >,
  }

  impl ApiRequest
  {
    /// A request with no timeout override and no continuation token.
    #[ must_use ]
    pub fn new( op : Op, payload : Value ) -> Self
    {
      Self { op, payload, timeout : None, next_token : None }
    }

    /// Override the per-request timeout.
    #[ must_use ]
    pub fn with_timeout( mut self, timeout_msec : u64 ) -> Self
    {
      self.timeout = Some( timeout_msec );
      self
    }

    /// Attach a continuation token.
    #[ must_use ]
    pub fn with_next_token( mut self, next_token : impl Into< String > ) -> Self
    {
      self.next_token = Some( next_token.into() );
      self
    }
  }

  /// Queue a request on the connection and return the single-shot channel
  /// the classified result will arrive on. Submission, busy retries, and
  /// classification happen on a background task.
  #[ must_use ]
  pub fn queue_request
  (
    conn : &Arc< ConnectionImpl >,
    request : ApiRequest,
  )
  -> oneshot::Receiver< DatomicResult< Value > >
  {
    let ( sender, receiver ) = oneshot::channel();
    let conn = Arc::clone( conn );
    tokio::spawn( async move
    {
      let result = run_request( conn, request ).await;
      let _ = sender.send( result );
    } );
    receiver
  }

  /// Queue a request and await its classified result.
  ///
  /// # Errors
  ///
  /// Propagates the classified anomaly, or a `fault` when the background
  /// task vanished without delivering.
  pub async fn request_response
  (
    conn : &Arc< ConnectionImpl >,
    request : ApiRequest,
  )
  -> DatomicResult< Value >
  {
    match queue_request( conn, request ).await
    {
      Ok( result ) => result,
      Err( _ ) => Err( Anomaly::fault( "request task dropped before delivering a response" ) ),
    }
  }

  async fn run_request( conn : Arc< ConnectionImpl >, request : ApiRequest ) -> DatomicResult< Value >
  {
    let timeout_msec = request.timeout.unwrap_or( conn.timeout );
    // The payload alone is marshalled; op and token ride as headers.
    let marshalled = marshal( &request.payload )?;
    let op = request.op;
    let next_token = request.next_token;

    let backoff = busy_backoff( RETRY_START_MSEC, RETRY_MAX_MSEC, RETRY_FACTOR );
    with_retry
    (
      move || attempt( Arc::clone( &conn ), op, next_token.clone(), marshalled.clone(), timeout_msec ),
      backoff,
    )
    .await
  }

  async fn attempt
  (
    conn : Arc< ConnectionImpl >,
    op : Op,
    next_token : Option< String >,
    marshalled : Marshalled,
    timeout_msec : u64,
  )
  -> DatomicResult< Value >
  {
    let http_request = build_request
    (
      &conn.endpoint,
      conn.database_id.as_deref(),
      op,
      next_token.as_deref(),
      &marshalled,
      &conn.signing,
    );
    let outcome = conn
      .transport
      .submit( http_request, Duration::from_millis( timeout_msec ) )
      .await;
    classify( outcome, Some( &conn.state ) )
  }
}

crate::mod_interface!
{
  exposed use ApiRequest;
  exposed use queue_request;
  exposed use request_response;
  exposed use RETRY_START_MSEC;
  exposed use RETRY_MAX_MSEC;
  exposed use RETRY_FACTOR;
}
