/// Declares HAL modules. Every function becomes a method of a hidden
/// per-module trait plus an exported wrapper that forwards to the backend.
/// A function given a body here is a default the backend may override.
macro_rules! hal_fn_def {
    (
        $(
            $(#[$mod_attr:meta])*
            $vis:vis mod $mod_name:ident {
                $($fn:tt)*
            }
        )+
    ) => {
        $(
            $(#[$mod_attr])*
            $vis mod $mod_name {
                #![allow(unused_imports)]
                use super::*;

                pub(crate) trait __HalTrait {
                    __hal_fn_trait! { $($fn)* }
                }

                pub(crate) struct __HalImpl;

                __hal_fn_export! { $($fn)* }
            }
        )+
    };
}

macro_rules! __hal_fn_trait {
    (
        $(#[$attr:meta])*
        $vis:vis fn $fn:ident ( $($arg:ident : $type:ty),* ) $( -> $ret:ty )?;
        $($tail:tt)*
    ) => {
        fn $fn ( $($arg : $type),* ) $( -> $ret )?;
        __hal_fn_trait! { $($tail)* }
    };
    (
        $(#[$attr:meta])*
        $vis:vis fn $fn:ident ( $($arg:ident : $type:ty),* ) $( -> $ret:ty )? $body:block
        $($tail:tt)*
    ) => {
        #[allow(unused_variables)]
        fn $fn ( $($arg : $type),* ) $( -> $ret )? $body
        __hal_fn_trait! { $($tail)* }
    };
    () => {};
}

macro_rules! __hal_fn_export {
    (
        $(#[$attr:meta])*
        $vis:vis fn $fn:ident ( $($arg:ident : $type:ty),* ) $( -> $ret:ty )?;
        $($tail:tt)*
    ) => {
        $(#[$attr])*
        #[inline]
        $vis fn $fn ( $($arg : $type),* ) $( -> $ret )? {
            <__HalImpl as __HalTrait>::$fn( $($arg),* )
        }
        __hal_fn_export! { $($tail)* }
    };
    (
        $(#[$attr:meta])*
        $vis:vis fn $fn:ident ( $($arg:ident : $type:ty),* ) $( -> $ret:ty )? $body:block
        $($tail:tt)*
    ) => {
        __hal_fn_export! {
            $(#[$attr])*
            $vis fn $fn ( $($arg : $type),* ) $( -> $ret )?;
            $($tail)*
        }
    };
    () => {};
}

/// Implements (part of) a module declared with `hal_fn_def!` for the
/// current backend.
macro_rules! hal_fn_impl {
    (
        $(
            impl mod $mod_name:ident$(::$mod_name_more:ident)* {
                $($fn:item)*
            }
        )+
    ) => {
        $(
            impl $mod_name$(::$mod_name_more)*::__HalTrait
                for $mod_name$(::$mod_name_more)*::__HalImpl
            {
                $($fn)*
            }
        )+
    };
}
