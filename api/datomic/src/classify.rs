//! Response classification : decode the body, derive an anomaly from the
//! transport, the status, or the body itself, and advance the watermark.

mod private
{
  use crate::
  {
    Anomaly, Category, DatomicResult, HttpResponse, TransportError, TransportErrorKind,
    Value, Watermark, WatermarkCell, unmarshal_content,
  };

  /// Classify one submission outcome.
  ///
  /// Applied in order, stopping at the first verdict :
  ///
  /// 1. an anomaly carried by the decoded body;
  /// 2. a transport failure, mapped to its category;
  /// 3. an HTTP error status, mapped to its category, with the decoded
  ///    body attached;
  /// 4. the decoded body.
  ///
  /// A successful body that carries a `dbs` watermark advances the given
  /// cell monotonically.
  ///
  /// # Errors
  ///
  /// Returns the derived anomaly for every non-success outcome.
  pub fn classify
  (
    outcome : Result< HttpResponse, TransportError >,
    state : Option< &WatermarkCell >,
  )
  -> DatomicResult< Value >
  {
    let result = classify_outcome( outcome );
    if let ( Ok( body ), Some( cell ) ) = ( &result, state )
    {
      advance_from_body( body, cell );
    }
    result
  }

  fn classify_outcome( outcome : Result< HttpResponse, TransportError > ) -> DatomicResult< Value >
  {
    let response = match outcome
    {
      Err( error ) => return Err( transport_anomaly( &error ) ),
      Ok( response ) => response,
    };

    let decoded = if response.body.is_empty()
    {
      None
    }
    else
    {
      Some( unmarshal_content( &response.body, response.content_type.as_deref().unwrap_or( "" ) ) )
    };

    // A body-borne anomaly takes precedence over the status line.
    if let Some( Ok( body ) ) = &decoded
    {
      if let Some( anomaly ) = Anomaly::from_body( body )
      {
        return Err( anomaly );
      }
    }

    if ( 400..=599 ).contains( &response.status )
    {
      let category = match response.status
      {
        403 => Category::Forbidden,
        503 => Category::Busy,
        504 => Category::Unavailable,
        400..=499 => Category::Incorrect,
        _ => Category::Fault,
      };
      let mut anomaly = Anomaly::new( category ).with_message( format!( "HTTP {}", response.status ) );
      anomaly = match decoded
      {
        Some( Ok( body ) ) => anomaly.with_http_result( body ),
        Some( Err( _ ) ) | None if !response.body.is_empty() =>
          anomaly.with_http_result( Value::Str( String::from_utf8_lossy( &response.body ).into_owned() ) ),
        _ => anomaly,
      };
      return Err( anomaly );
    }

    match decoded
    {
      Some( result ) => result,
      None => Ok( Value::Nil ),
    }
  }

  fn transport_anomaly( error : &TransportError ) -> Anomaly
  {
    let category = match error.kind
    {
      TransportErrorKind::Timeout => Category::Interrupted,
      TransportErrorKind::Throttled => Category::Busy,
      TransportErrorKind::ConnectFailed => Category::Unavailable,
      TransportErrorKind::ResolveFailed => Category::NotFound,
      TransportErrorKind::Other => Category::Fault,
    };
    Anomaly::new( category ).with_message( error.to_string() )
  }

  fn advance_from_body( body : &Value, cell : &WatermarkCell )
  {
    let Some( dbs ) = body.get( "dbs" ).and_then( Value::as_vec ) else { return };
    let Some( first ) = dbs.first() else { return };
    let ( Some( t ), Some( next_t ) ) =
      ( first.get( "t" ).and_then( Value::as_u64 ), first.get( "next-t" ).and_then( Value::as_u64 ) )
    else
    {
      return;
    };
    cell.advance( Watermark { t, next_t } );
  }
}

crate::mod_interface!
{
  exposed use classify;
}
