//! Table of error number names known at build time.
//!
//! The registry is seeded from this table at startup. A name whose constant is
//! not defined on the target platform is still listed, with `None` as its number,
//! so that it can be exposed as an alias of `NOERROR`.

/// Builds a `(name, number)` table. The numbers come from `libc` when the cfg
/// predicate holds for the target; otherwise every name is listed as undefined.
macro_rules! errno_table {
    (#[cfg($($pred:tt)*)] $($name:ident),* $(,)?) => {{
        #[cfg($($pred)*)]
        const TABLE: &[(&str, Option<i32>)] = &[$((stringify!($name), Some(libc::$name))),*];
        #[cfg(not($($pred)*))]
        const TABLE: &[(&str, Option<i32>)] = &[$((stringify!($name), None)),*];
        TABLE
    }};
}

static POSIX: &[(&str, Option<i32>)] = errno_table![
    #[cfg(unix)]
    EPERM,
    ENOENT,
    ESRCH,
    EINTR,
    EIO,
    ENXIO,
    E2BIG,
    ENOEXEC,
    EBADF,
    ECHILD,
    EAGAIN,
    ENOMEM,
    EACCES,
    EFAULT,
    ENOTBLK,
    EBUSY,
    EEXIST,
    EXDEV,
    ENODEV,
    ENOTDIR,
    EISDIR,
    EINVAL,
    ENFILE,
    EMFILE,
    ENOTTY,
    ETXTBSY,
    EFBIG,
    ENOSPC,
    ESPIPE,
    EROFS,
    EMLINK,
    EPIPE,
    EDOM,
    ERANGE,
    EDEADLK,
    ENAMETOOLONG,
    ENOLCK,
    ENOSYS,
    ENOTEMPTY,
    ELOOP,
    EWOULDBLOCK,
    ENOMSG,
    EIDRM,
    EREMOTE,
    ENOLINK,
    EPROTO,
    EMULTIHOP,
    EBADMSG,
    EOVERFLOW,
    EILSEQ,
    EUSERS,
    ENOTSOCK,
    EDESTADDRREQ,
    EMSGSIZE,
    EPROTOTYPE,
    ENOPROTOOPT,
    EPROTONOSUPPORT,
    ESOCKTNOSUPPORT,
    EOPNOTSUPP,
    EPFNOSUPPORT,
    EAFNOSUPPORT,
    EADDRINUSE,
    EADDRNOTAVAIL,
    ENETDOWN,
    ENETUNREACH,
    ENETRESET,
    ECONNABORTED,
    ECONNRESET,
    ENOBUFS,
    EISCONN,
    ENOTCONN,
    ESHUTDOWN,
    ETOOMANYREFS,
    ETIMEDOUT,
    ECONNREFUSED,
    EHOSTDOWN,
    EHOSTUNREACH,
    EALREADY,
    EINPROGRESS,
    ESTALE,
    EDQUOT,
    ECANCELED,
    EOWNERDEAD,
    ENOTRECOVERABLE,
    ENOTSUP,
];

static LINUX: &[(&str, Option<i32>)] = errno_table![
    #[cfg(any(target_os = "linux", target_os = "android"))]
    ECHRNG,
    EL2NSYNC,
    EL3HLT,
    EL3RST,
    ELNRNG,
    EUNATCH,
    ENOCSI,
    EL2HLT,
    EBADE,
    EBADR,
    EXFULL,
    ENOANO,
    EBADRQC,
    EBADSLT,
    EDEADLOCK,
    EBFONT,
    ENOSTR,
    ENODATA,
    ETIME,
    ENOSR,
    ENONET,
    ENOPKG,
    EADV,
    ESRMNT,
    ECOMM,
    EDOTDOT,
    ENOTUNIQ,
    EBADFD,
    EREMCHG,
    ELIBACC,
    ELIBBAD,
    ELIBSCN,
    ELIBMAX,
    ELIBEXEC,
    ERESTART,
    ESTRPIPE,
    EUCLEAN,
    ENOTNAM,
    ENAVAIL,
    EISNAM,
    EREMOTEIO,
    ENOMEDIUM,
    EMEDIUMTYPE,
    ENOKEY,
    EKEYEXPIRED,
    EKEYREVOKED,
    EKEYREJECTED,
    ERFKILL,
];

static BSD: &[(&str, Option<i32>)] = errno_table![
    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    EPROCLIM,
    EBADRPC,
    ERPCMISMATCH,
    EPROGUNAVAIL,
    EPROGMISMATCH,
    EPROCUNAVAIL,
    EFTYPE,
    EAUTH,
    ENEEDAUTH,
    ENOATTR,
];

static APPLE: &[(&str, Option<i32>)] = errno_table![
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    EPWROFF,
    EDEVERR,
    EBADEXEC,
    EBADARCH,
    ESHLIBVERS,
    EBADMACHO,
    ENOPOLICY,
    EQFULL,
];

/// Iterates over every known name with its number on this platform.
///
/// Names sharing a number (`EWOULDBLOCK` and `EAGAIN` on most systems) are all
/// listed; the first one listed is the canonical name.
pub fn known_errors() -> impl Iterator<Item = (&'static str, Option<i32>)> {
    POSIX.iter().chain(LINUX).chain(BSD).chain(APPLE).copied()
}

/// Returns the canonical symbolic name of an error number, if it is known.
#[must_use]
pub fn strerrno(errno: i32) -> Option<&'static str> {
    known_errors().find_map(|(name, n)| (n == Some(errno)).then_some(name))
}
