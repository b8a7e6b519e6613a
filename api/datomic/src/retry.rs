//! Retry engine : call until the backoff declines to wait again.

mod private
{
  use core::future::Future;
  use core::time::Duration;

  use crate::DatomicResult;

  /// Invoke `req_fn` until `backoff_fn` returns no delay, then yield the
  /// final response.
  ///
  /// `backoff_fn` inspects each response : a delay in milliseconds means
  /// wait and repeat, nothing means deliver whatever response is at hand.
  ///
  /// # Errors
  ///
  /// Yields whatever response the final attempt produced.
  pub async fn with_retry< T, F, Fut, B >( mut req_fn : F, mut backoff_fn : B ) -> DatomicResult< T >
  where
    F : FnMut() -> Fut,
    Fut : Future< Output = DatomicResult< T > >,
    B : FnMut( &DatomicResult< T > ) -> Option< u64 >,
  {
    loop
    {
      let response = req_fn().await;
      match backoff_fn( &response )
      {
        Some( delay_msec ) =>
        {
          #[ cfg( feature = "logging" ) ]
          tracing::debug!( delay_msec, "busy, backing off" );
          tokio::time::sleep( Duration::from_millis( delay_msec ) ).await;
        }
        None => return response,
      }
    }
  }

  /// A backoff ratchet that waits only on `busy` anomalies.
  ///
  /// The first qualifying response waits `start` ms, each subsequent one
  /// multiplies the wait by `factor`, and once the wait would exceed
  /// `max` the ratchet gives up.
  ///
  /// # Examples
  ///
  /// ```
  /// use api_datomic::{ busy_backoff, Anomaly, Category, DatomicResult };
  ///
  /// let mut backoff = busy_backoff( 100, 200, 2 );
  /// let busy : DatomicResult< () > = Err( Anomaly::new( Category::Busy ) );
  /// assert_eq!( backoff( &busy ), Some( 100 ) );
  /// assert_eq!( backoff( &busy ), Some( 200 ) );
  /// assert_eq!( backoff( &busy ), None );
  /// ```
  pub fn busy_backoff< T >( start : u64, max : u64, factor : u64 )
    -> impl FnMut( &DatomicResult< T > ) -> Option< u64 >
  {
    let mut delay = start / factor;
    move | response |
    {
      let busy = matches!( response, Err( anomaly ) if anomaly.is_busy() );
      if !busy
      {
        return None;
      }
      delay = delay.saturating_mul( factor );
      if delay > max
      {
        #[ cfg( feature = "logging" ) ]
        tracing::warn!( "busy retries exhausted" );
        None
      }
      else
      {
        Some( delay )
      }
    }
  }
}

crate::mod_interface!
{
  exposed use with_retry;
  exposed use busy_backoff;
}
