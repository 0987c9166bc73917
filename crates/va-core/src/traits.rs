use crate::frame::FrameBuffer;

/// Fournit des frames décodées au pipeline, dans l'ordre de lecture.
///
/// Implémenté par : `ImageSource`, `VideoSource`.
///
/// # Example
/// ```
/// use va_core::traits::Source;
/// use va_core::frame::FrameBuffer;
///
/// struct Once(Option<FrameBuffer>);
/// impl Source for Once {
///     fn next_frame(&mut self) -> Option<FrameBuffer> { self.0.take() }
///     fn native_size(&self) -> (u32, u32) { (1, 1) }
///     fn estimated_frames(&self) -> Option<u64> { Some(1) }
/// }
///
/// let mut src = Once(Some(FrameBuffer::new(1, 1, 3)));
/// assert!(src.next_frame().is_some());
/// assert!(src.next_frame().is_none());
/// assert!(src.take_error().is_none());
/// ```
pub trait Source: Send {
    /// Retourne la prochaine frame retenue.
    ///
    /// Retourne `None` quand la source est épuisée (fin de vidéo).
    fn next_frame(&mut self) -> Option<FrameBuffer>;

    /// Dimensions natives de la source.
    fn native_size(&self) -> (u32, u32);

    /// Nombre de frames que la source va produire, si connu.
    fn estimated_frames(&self) -> Option<u64>;

    /// Erreur qui a interrompu la source, à consulter quand `next_frame`
    /// retourne `None`.
    ///
    /// `None` après une fin normale. Une source qui ne peut pas échouer en
    /// cours de lecture garde l'implémentation par défaut.
    fn take_error(&mut self) -> Option<anyhow::Error> {
        None
    }
}
