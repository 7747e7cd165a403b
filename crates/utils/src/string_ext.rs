/// Extends string types with keyword-field helpers
pub trait StringExt {
    /// Pads a keyword name out to the fixed 8-character field
    ///
    /// ```rust
    /// # use ecltools_utils::StringExt;
    /// assert_eq!("ZCORN".keyword_field(), "ZCORN   ".to_string());
    /// ```
    fn keyword_field(&self) -> String;

    /// Checks that every character is legal inside a keyword name field
    ///
    /// Names are printable ASCII, space padded. Anything else is a strong
    /// hint that a header was decoded under the wrong byte order.
    ///
    /// ```rust
    /// # use ecltools_utils::StringExt;
    /// assert!("SEQNUM  ".is_keyword_field());
    /// assert!(!"SEQ\u{1}UM  ".is_keyword_field());
    /// ```
    fn is_keyword_field(&self) -> bool;
}

impl<T: AsRef<str>> StringExt for T {
    fn keyword_field(&self) -> String {
        crate::f!("{:<8}", self.as_ref())
    }

    fn is_keyword_field(&self) -> bool {
        self.as_ref()
            .chars()
            .all(|c| c.is_ascii_graphic() || c == ' ')
    }
}
