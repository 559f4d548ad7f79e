//! Operation boundary macros
//!
//! Every pipeline operation logs one `start` event and exactly one of `end` or
//! `end_error`, all carrying `component`, `op` and `event`. Extra fields use
//! the usual `tracing` field syntax. Callers need `tracing` and
//! `techmetrics_core_types` as dependencies.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:ident, $event:expr, $op:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event,
            $($($field)*)?
        )
    };
}

/// Log the start of an operation
///
/// ```
/// # use techmetrics_core::log_op_start;
/// log_op_start!("ingest_github");
/// log_op_start!("refresh", run_id = "0190c3a2", source = "github");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            info,
            techmetrics_core_types::schema::EVENT_START,
            $op
            $(, $($field)*)?
        )
    };
}

/// Log the successful end of an operation; `duration_ms` is required
///
/// ```
/// # use techmetrics_core::log_op_end;
/// log_op_end!("refresh", duration_ms = 12u64, rows_published = 40usize);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            info,
            techmetrics_core_types::schema::EVENT_END,
            $op,
            duration_ms = $duration,
            $($($field)*)?
        )
    };
}

/// Log the failed end of an operation
///
/// Anything convertible into `ExError` is accepted. The conversion consumes
/// the error, so pass a clone when it is returned afterwards.
///
/// ```
/// # use techmetrics_core::log_op_error;
/// # use techmetrics_core::errors::MetricsError;
/// let err = MetricsError::UnknownPackage { pypi_name: "left-pad".into() };
/// log_op_error!("ingest_downloads", err, duration_ms = 3u64, run_id = "0190c3a2");
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__log_op_event!(
            error,
            techmetrics_core_types::schema::EVENT_END_ERROR,
            $op,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            err_message = %ex_err,
            $($($field)*)?
        );
    }};
}
