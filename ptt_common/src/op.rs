/// Derives operator traits for a newtype over an integer by forwarding to the wrapped value.
///
/// ```ignore
/// op!(binary Money: Add::add, Sub::sub);
/// op!(assign Money: AddAssign::add_assign);
/// op!(unary Money: Neg::neg);
/// ```
#[macro_export]
macro_rules! op {
    (binary $newtype:ident: $($op:ident::$method:ident),+ $(,)?) => {
        $(
            impl $op for $newtype {
                type Output = $newtype;

                fn $method(self, rhs: $newtype) -> $newtype {
                    $newtype(self.0.$method(rhs.0))
                }
            }
        )+
    };

    (assign $newtype:ident: $($op:ident::$method:ident),+ $(,)?) => {
        $(
            impl $op for $newtype {
                fn $method(&mut self, rhs: $newtype) {
                    self.0.$method(rhs.0);
                }
            }
        )+
    };

    (unary $newtype:ident: $($op:ident::$method:ident),+ $(,)?) => {
        $(
            impl $op for $newtype {
                type Output = $newtype;

                fn $method(self) -> $newtype {
                    $newtype(self.0.$method())
                }
            }
        )+
    };
}
